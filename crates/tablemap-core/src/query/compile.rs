use crate::{
    backend::Dialect,
    error::{OrmError, SchemaError, UnsupportedExpressionError},
    model::TableDefinition,
    query::expr::{CompareOp, Expr, Method},
    value::Value,
};
use std::sync::Arc;

///
/// CompiledPredicate
///
/// Parameterized SQL fragment plus its bind values.
/// `parameter_names` and `parameter_values` are parallel and names are
/// unique within one predicate.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledPredicate {
    pub command_text: String,
    pub parameter_names: Vec<String>,
    pub parameter_values: Vec<Value>,
}

impl CompiledPredicate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.command_text.is_empty()
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.parameter_names
            .iter()
            .map(String::as_str)
            .zip(&self.parameter_values)
    }

    /// Rewrite `from.` column qualifiers to `to.`.
    #[must_use]
    pub fn replace_table_alias(&self, from: &str, to: &str) -> Self {
        Self {
            command_text: replace_qualifier(&self.command_text, from, to),
            parameter_names: self.parameter_names.clone(),
            parameter_values: self.parameter_values.clone(),
        }
    }
}

// Replace `from.` only where it starts an identifier.
fn replace_qualifier(text: &str, from: &str, to: &str) -> String {
    let needle = format!("{from}.");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(&needle) {
        let boundary = rest[..pos]
            .chars()
            .next_back()
            .or_else(|| out.chars().next_back())
            .is_none_or(|c| !is_identifier_char(c));

        out.push_str(&rest[..pos]);
        if boundary {
            out.push_str(to);
            out.push('.');
        } else {
            out.push_str(&needle);
        }
        rest = &rest[pos + needle.len()..];
    }
    out.push_str(rest);

    out
}

const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

///
/// PredicateCompiler
///
/// Translates an expression tree over one table into a [`CompiledPredicate`].
///

pub struct PredicateCompiler<'a> {
    table: &'a TableDefinition,
    dialect: Dialect,
}

impl<'a> PredicateCompiler<'a> {
    #[must_use]
    pub const fn new(table: &'a TableDefinition, dialect: Dialect) -> Self {
        Self { table, dialect }
    }

    /// Compile `expr`.
    ///
    /// Parameter names are `p<parameter_prefix><index>`. Root columns are
    /// qualified with `root_alias` when one is given; association chains
    /// require it.
    pub fn compile(
        &self,
        expr: &Expr,
        parameter_prefix: &str,
        root_alias: Option<&str>,
    ) -> Result<CompiledPredicate, OrmError> {
        let mut state = CompileState {
            parameter_prefix,
            root_alias,
            compiled: CompiledPredicate::default(),
        };
        state.compiled.command_text = self.render(expr, &mut state)?;

        Ok(state.compiled)
    }

    fn render(&self, expr: &Expr, state: &mut CompileState<'_>) -> Result<String, OrmError> {
        match expr {
            Expr::Member(path) => self.column(path, state.root_alias),
            Expr::Constant(Value::Null) => Ok("null".to_string()),
            Expr::Constant(value) => Ok(self.bind(value.clone(), state)),
            Expr::Compare { op, left, right } => self.render_compare(*op, left, right, state),
            Expr::And(l, r) => Ok(format!(
                "({} AND {})",
                self.render(l, state)?,
                self.render(r, state)?
            )),
            Expr::Or(l, r) => Ok(format!(
                "({} OR {})",
                self.render(l, state)?,
                self.render(r, state)?
            )),
            Expr::Not(inner) => Ok(format!("NOT ({})", self.render(inner, state)?)),
            Expr::Arithmetic { op, left, right } => Ok(format!(
                "({} {} {})",
                self.render(left, state)?,
                op.sql(),
                self.render(right, state)?
            )),
            Expr::Call {
                method,
                target,
                args,
            } => self.render_call(expr, method, target, args, state),
            Expr::Conditional { .. } => Err(unsupported(
                expr,
                "conditional expressions have no SQL translation",
            )),
        }
    }

    fn render_compare(
        &self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
        state: &mut CompileState<'_>,
    ) -> Result<String, OrmError> {
        let operand = match (left, right) {
            (other, Expr::Constant(Value::Null)) | (Expr::Constant(Value::Null), other) => {
                Some(other)
            }
            _ => None,
        };

        if let Some(operand) = operand {
            let text = self.render(operand, state)?;
            return match op {
                CompareOp::Eq => Ok(format!("{text} is null")),
                CompareOp::Ne => Ok(format!("{text} is not null")),
                _ => Err(UnsupportedExpressionError::new(
                    "Compare",
                    format!("null can only be compared with = or <>, not {}", op.sql()),
                )
                .into()),
            };
        }

        Ok(format!(
            "{} {} {}",
            self.render(left, state)?,
            op.sql(),
            self.render(right, state)?
        ))
    }

    fn render_call(
        &self,
        expr: &Expr,
        method: &Method,
        target: &Expr,
        args: &[Expr],
        state: &mut CompileState<'_>,
    ) -> Result<String, OrmError> {
        match method {
            Method::Contains | Method::StartsWith | Method::EndsWith => {
                let [Expr::Constant(Value::Text(text))] = args else {
                    return Err(unsupported(expr, "expects one text literal argument"));
                };
                let pattern = match method {
                    Method::Contains => format!("%{text}%"),
                    Method::StartsWith => format!("{text}%"),
                    _ => format!("%{text}"),
                };
                let target = self.render(target, state)?;

                Ok(format!("{target} LIKE {}", self.bind(Value::Text(pattern), state)))
            }

            Method::In => {
                let target = self.render(target, state)?;
                if args.is_empty() {
                    return Ok("1 = 0".to_string());
                }

                let mut items = Vec::with_capacity(args.len());
                for arg in args {
                    let Expr::Constant(value) = arg else {
                        return Err(unsupported(expr, "expects literal arguments"));
                    };
                    items.push(self.bind(value.clone(), state));
                }

                Ok(format!("{target} IN ({})", items.join(", ")))
            }

            Method::ToLower | Method::ToUpper => {
                if !args.is_empty() {
                    return Err(unsupported(expr, "takes no arguments"));
                }
                let function = if *method == Method::ToLower {
                    "lower"
                } else {
                    "upper"
                };

                Ok(format!("{function}({})", self.render(target, state)?))
            }

            Method::Other(_) => Err(unsupported(expr, "method has no SQL translation")),
        }
    }

    // Resolve a member path to a (possibly qualified) column.
    fn column(&self, path: &[&'static str], root_alias: Option<&str>) -> Result<String, OrmError> {
        let Some((&column, chain)) = path.split_last() else {
            return Err(UnsupportedExpressionError::new("Member", "empty member path").into());
        };

        if chain.is_empty() {
            scalar_field(self.table, column)?;
            return Ok(match root_alias {
                Some(alias) => format!("{alias}.{column}"),
                None => column.to_string(),
            });
        }

        if root_alias.is_none() {
            return Err(UnsupportedExpressionError::new(
                "Member",
                format!(
                    "association chain '{}' needs a root alias",
                    path.join(".")
                ),
            )
            .into());
        }

        let mut target: Option<Arc<TableDefinition>> = None;
        for &name in chain {
            let table = target.as_deref().unwrap_or(self.table);
            let field = table.field(name).ok_or_else(|| unknown_field(table, name))?;
            let association = field.association().ok_or_else(|| {
                UnsupportedExpressionError::new(
                    "Member",
                    format!("'{}.{name}' is not an association", table.entity_name()),
                )
            })?;
            let next = association.target();
            target = Some(next);
        }

        let table = target.as_deref().unwrap_or(self.table);
        scalar_field(table, column)?;

        Ok(format!("{}.{column}", chain.join("_")))
    }

    fn bind(&self, value: Value, state: &mut CompileState<'_>) -> String {
        let index = state.compiled.parameter_values.len();
        let name = unique_name(
            &state.compiled.parameter_names,
            format!("p{}{index}", state.parameter_prefix),
        );
        let placeholder = self.dialect.placeholder(&name);

        state.compiled.parameter_names.push(name);
        state.compiled.parameter_values.push(value.normalize_literal());

        placeholder
    }
}

struct CompileState<'a> {
    parameter_prefix: &'a str,
    root_alias: Option<&'a str>,
    compiled: CompiledPredicate,
}

fn unique_name(taken: &[String], base: String) -> String {
    if !taken.contains(&base) {
        return base;
    }

    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// The path must end on a scalar of `table`.
fn scalar_field(table: &TableDefinition, name: &str) -> Result<(), OrmError> {
    let field = table.field(name).ok_or_else(|| unknown_field(table, name))?;
    if field.is_scalar() {
        Ok(())
    } else {
        Err(UnsupportedExpressionError::new(
            "Member",
            format!(
                "member chain ends on association '{}.{name}'",
                table.entity_name()
            ),
        )
        .into())
    }
}

fn unknown_field(table: &TableDefinition, name: &str) -> OrmError {
    SchemaError::UnknownField {
        entity: table.entity_name().to_string(),
        field: name.to_string(),
    }
    .into()
}

fn unsupported(expr: &Expr, reason: &str) -> OrmError {
    UnsupportedExpressionError::new(expr.kind(), reason).into()
}
