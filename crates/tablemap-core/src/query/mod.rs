//! Typed predicates and their translation to parameterized SQL.

mod compile;
mod expr;


pub use compile::{CompiledPredicate, PredicateCompiler};
pub use expr::{ArithmeticOp, Association, Column, CompareOp, Expr, Method, Predicate, TextLike};
