use crate::{
    query::CompiledPredicate,
    value::{RowDictionary, Value},
};

///
/// DboCommand
///
/// Final statement text plus everything a connection needs to bind it.
/// Explicit parameters win over same-named columns of the bound row.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DboCommand {
    object_name: String,
    text: String,
    parameter_names: Vec<String>,
    parameter_values: Vec<Value>,
    row: Option<RowDictionary>,
}

impl DboCommand {
    pub fn new(object_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Same bindings, different text.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Add a named parameter; an `ObjectName.` qualifier on the name is dropped.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        let bare = name
            .strip_prefix(self.object_name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);

        self.parameter_names.push(bare.to_string());
        self.parameter_values.push(value.into());
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: &CompiledPredicate) -> Self {
        for (name, value) in predicate.parameters() {
            self = self.with_parameter(name, value.clone());
        }
        self
    }

    /// Use the scalar fields of a whole object as a parameter source.
    #[must_use]
    pub fn with_row(mut self, row: RowDictionary) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn row(&self) -> Option<&RowDictionary> {
        self.row.as_ref()
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parameter_names
            .iter()
            .map(String::as_str)
            .zip(&self.parameter_values)
    }

    /// Every bindable name once: explicit parameters first, then row columns.
    #[must_use]
    pub fn bindings(&self) -> Vec<(&str, &Value)> {
        let mut out: Vec<(&str, &Value)> = Vec::new();
        for (name, value) in self.parameters() {
            if !out.iter().any(|(n, _)| *n == name) {
                out.push((name, value));
            }
        }
        if let Some(row) = &self.row {
            for (name, value) in row {
                if !out.iter().any(|(n, _)| *n == name) {
                    out.push((name.as_str(), value));
                }
            }
        }

        out
    }
}
