use crate::value::Value;
use std::{
    fmt,
    marker::PhantomData,
    ops::{BitAnd, BitOr, Not},
};

///
/// Expression AST
///
/// Schema-agnostic boolean/value tree over one root entity type.
/// Column names are resolved against the catalog only when compiled.
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

///
/// ArithmeticOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

///
/// Method
///
/// Method-call nodes. `Other` carries names the compiler has no SQL form for.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    In,
    ToLower,
    ToUpper,
    Other(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::In => "In",
            Self::ToLower => "ToLower",
            Self::ToUpper => "ToUpper",
            Self::Other(name) => name,
        };
        f.write_str(name)
    }
}

///
/// Expr
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Field access from the root; more than one segment walks associations.
    Member(Vec<&'static str>),
    Constant(Value),
    Compare {
        op: CompareOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Not(Box<Self>),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    Call {
        method: Method,
        target: Box<Self>,
        args: Vec<Self>,
    },
    Conditional {
        test: Box<Self>,
        then: Box<Self>,
        otherwise: Box<Self>,
    },
}

impl Expr {
    #[must_use]
    pub fn member(path: &[&'static str]) -> Self {
        Self::Member(path.to_vec())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn compare(op: CompareOp, left: Self, right: Self) -> Self {
        Self::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }

    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn call(method: Method, target: Self, args: Vec<Self>) -> Self {
        Self::Call {
            method,
            target: Box::new(target),
            args,
        }
    }

    #[must_use]
    pub fn conditional(test: Self, then: Self, otherwise: Self) -> Self {
        Self::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Node kind label used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Self::Member(_) => "Member".to_string(),
            Self::Constant(_) => "Constant".to_string(),
            Self::Compare { .. } => "Compare".to_string(),
            Self::And(..) => "And".to_string(),
            Self::Or(..) => "Or".to_string(),
            Self::Not(_) => "Not".to_string(),
            Self::Arithmetic { .. } => "Arithmetic".to_string(),
            Self::Call { method, .. } => format!("Call({method})"),
            Self::Conditional { .. } => "Conditional".to_string(),
        }
    }

    /// Re-root every member path under the association `field`.
    #[must_use]
    pub fn under(self, field: &'static str) -> Self {
        self.under_path(&[field])
    }

    fn under_path(self, prefix: &[&'static str]) -> Self {
        let wrap = |expr: Box<Self>| Box::new(expr.under_path(prefix));

        match self {
            Self::Member(path) => {
                let mut full = prefix.to_vec();
                full.extend(path);
                Self::Member(full)
            }
            Self::Constant(value) => Self::Constant(value),
            Self::Compare { op, left, right } => Self::Compare {
                op,
                left: wrap(left),
                right: wrap(right),
            },
            Self::And(l, r) => Self::And(wrap(l), wrap(r)),
            Self::Or(l, r) => Self::Or(wrap(l), wrap(r)),
            Self::Not(inner) => Self::Not(wrap(inner)),
            Self::Arithmetic { op, left, right } => Self::Arithmetic {
                op,
                left: wrap(left),
                right: wrap(right),
            },
            Self::Call {
                method,
                target,
                args,
            } => Self::Call {
                method,
                target: wrap(target),
                args: args.into_iter().map(|a| a.under_path(prefix)).collect(),
            },
            Self::Conditional {
                test,
                then,
                otherwise,
            } => Self::Conditional {
                test: wrap(test),
                then: wrap(then),
                otherwise: wrap(otherwise),
            },
        }
    }
}

///
/// Predicate
///
/// Boolean expression over entity type `E`.
///

pub struct Predicate<E> {
    expr: Expr,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Predicate<E> {
    #[must_use]
    pub const fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

impl<E> PartialEq for Predicate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<E> BitAnd for Predicate<E> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_expr(self.expr.and(rhs.expr))
    }
}

impl<E> BitAnd for &Predicate<E> {
    type Output = Predicate<E>;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::from_expr(self.expr.clone().and(rhs.expr.clone()))
    }
}

impl<E> BitOr for Predicate<E> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_expr(self.expr.or(rhs.expr))
    }
}

impl<E> BitOr for &Predicate<E> {
    type Output = Predicate<E>;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::from_expr(self.expr.clone().or(rhs.expr.clone()))
    }
}

impl<E> Not for Predicate<E> {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_expr(self.expr.not())
    }
}

///
/// Column
///
/// Typed handle on a value of `E`: a plain field, an association chain, or
/// a computed operand (`lower`, arithmetic). `T` is the Rust field type and
/// bounds the literals it can be compared with.
///

pub struct Column<E, T> {
    expr: Expr,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Column<E, T> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::from_expr(Expr::Member(vec![name]))
    }

    #[must_use]
    pub const fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    #[must_use]
    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn compare(&self, op: CompareOp, value: Value) -> Predicate<E> {
        Predicate::from_expr(Expr::compare(op, self.expr.clone(), Expr::Constant(value)))
    }

    /// Compare against another operand of the same entity.
    #[must_use]
    pub fn compare_with(&self, op: CompareOp, other: &Self) -> Predicate<E> {
        Predicate::from_expr(Expr::compare(op, self.expr.clone(), other.expr.clone()))
    }

    #[must_use]
    pub fn is_null(&self) -> Predicate<E> {
        self.compare(CompareOp::Eq, Value::Null)
    }

    #[must_use]
    pub fn is_not_null(&self) -> Predicate<E> {
        self.compare(CompareOp::Ne, Value::Null)
    }
}

impl<E, T: Into<Value>> Column<E, T> {
    pub fn eq(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Eq, value.into().into())
    }

    pub fn ne(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Ne, value.into().into())
    }

    pub fn lt(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Lt, value.into().into())
    }

    pub fn lte(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Lte, value.into().into())
    }

    pub fn gt(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Gt, value.into().into())
    }

    pub fn gte(&self, value: impl Into<T>) -> Predicate<E> {
        self.compare(CompareOp::Gte, value.into().into())
    }

    /// Membership in a literal set; an empty set matches nothing.
    pub fn in_<I>(&self, values: I) -> Predicate<E>
    where
        I: IntoIterator,
        I::Item: Into<T>,
    {
        let args = values
            .into_iter()
            .map(|value| Expr::Constant(value.into().into()))
            .collect();

        Predicate::from_expr(Expr::call(Method::In, self.expr.clone(), args))
    }

    fn arithmetic(&self, op: ArithmeticOp, value: impl Into<T>) -> Self {
        Self::from_expr(Expr::Arithmetic {
            op,
            left: Box::new(self.expr.clone()),
            right: Box::new(Expr::Constant(value.into().into())),
        })
    }

    #[must_use]
    pub fn add(&self, value: impl Into<T>) -> Self {
        self.arithmetic(ArithmeticOp::Add, value)
    }

    #[must_use]
    pub fn sub(&self, value: impl Into<T>) -> Self {
        self.arithmetic(ArithmeticOp::Sub, value)
    }

    #[must_use]
    pub fn mul(&self, value: impl Into<T>) -> Self {
        self.arithmetic(ArithmeticOp::Mul, value)
    }

    #[must_use]
    pub fn div(&self, value: impl Into<T>) -> Self {
        self.arithmetic(ArithmeticOp::Div, value)
    }
}

// text operations apply to both `String` and `Option<String>` columns
impl<E, T: TextLike> Column<E, T> {
    fn text_call(&self, method: Method, text: impl Into<String>) -> Predicate<E> {
        Predicate::from_expr(Expr::call(
            method,
            self.expr.clone(),
            vec![Expr::Constant(Value::Text(text.into()))],
        ))
    }

    pub fn contains(&self, text: impl Into<String>) -> Predicate<E> {
        self.text_call(Method::Contains, text)
    }

    pub fn starts_with(&self, text: impl Into<String>) -> Predicate<E> {
        self.text_call(Method::StartsWith, text)
    }

    pub fn ends_with(&self, text: impl Into<String>) -> Predicate<E> {
        self.text_call(Method::EndsWith, text)
    }

    #[must_use]
    pub fn lower(&self) -> Self {
        Self::from_expr(Expr::call(Method::ToLower, self.expr.clone(), Vec::new()))
    }

    #[must_use]
    pub fn upper(&self) -> Self {
        Self::from_expr(Expr::call(Method::ToUpper, self.expr.clone(), Vec::new()))
    }
}

impl<E, T> Clone for Column<E, T> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<E, T> fmt::Debug for Column<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.expr).finish()
    }
}

///
/// TextLike
///
/// Marker for field types that map to text columns.
///

pub trait TextLike {}

impl TextLike for String {}
impl TextLike for Option<String> {}

///
/// Association
///
/// Typed handle on an association field from `E` to `C`.
///

pub struct Association<E, C> {
    path: Vec<&'static str>,
    _marker: PhantomData<fn() -> (E, C)>,
}

impl<E, C> Association<E, C> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            path: vec![name],
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    /// Continue the chain into a column of the associated type.
    #[must_use]
    pub fn then<T>(&self, column: Column<C, T>) -> Column<E, T> {
        Column::from_expr(column.into_expr().under_path(&self.path))
    }

    /// Continue the chain through a nested association.
    #[must_use]
    pub fn join<D>(&self, next: Association<C, D>) -> Association<E, D> {
        let mut path = self.path.clone();
        path.extend(next.path);

        Association {
            path,
            _marker: PhantomData,
        }
    }
}

impl<E, C> Clone for Association<E, C> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, C> fmt::Debug for Association<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Association").field(&self.path).finish()
    }
}
