use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use std::collections::BTreeMap;

///
/// RowDictionary
///
/// One physical result row: column name → scalar value.
/// Association columns carry their owning field chain as an `_`-joined prefix.
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct RowDictionary(BTreeMap<String, Value>);

impl RowDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column; the first occurrence of a name wins.
    pub fn push_column(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if self.0.contains_key(&name) {
            return false;
        }
        self.0.insert(name, value);

        true
    }

    /// Set or replace a column value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RowDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (name, value) in iter {
            row.push_column(name, value.into());
        }

        row
    }
}
