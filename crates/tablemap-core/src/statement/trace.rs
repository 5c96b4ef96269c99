use crate::{backend::Dialect, statement::DboCommand, value::Value};

/// Render a command with its bound values substituted inline.
///
/// For logs and diagnostics only; the output is never executed.
#[must_use]
pub fn statement_trace(command: &DboCommand, dialect: &Dialect) -> String {
    let bindings = command.bindings();
    let text = command.text();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != dialect.parameter_prefix {
            out.push(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !(next.is_ascii_alphanumeric() || next == '_') {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }

        let name = &text[start + c.len_utf8()..end];
        match bindings.iter().find(|(n, _)| *n == name) {
            Some((_, value)) => out.push_str(&literal(value, dialect)),
            None => out.push_str(&text[start..end]),
        }
    }

    out
}

fn literal(value: &Value, dialect: &Dialect) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => i64::from(*v).to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
        Value::Blob(_) => format!("X'{value}'"),
        Value::DateTime(dt) => format!("'{}'", dt.format(dialect.datetime_format)),
    }
}
