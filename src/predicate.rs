//! Compiles attribute predicates into parameterised WHERE fragments.
//!
//! A predicate value is either a scalar, meaning equality, or a single-key
//! object whose key names a comparison operator. User values are only ever
//! bound through `?` placeholders, never written into the statement text.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::{SchemaError, quote_ident};

/// A compiled WHERE fragment plus the bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compiled {
    pub clause: String,
    pub params: Vec<Value>,
}

impl Compiled {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// Compile an attribute map into a conjunction of comparison fragments.
pub fn compile(attributes: &BTreeMap<String, Value>) -> Result<Compiled, SchemaError> {
    let mut parts = Vec::with_capacity(attributes.len());
    let mut params = Vec::with_capacity(attributes.len());

    for (name, value) in attributes {
        match value {
            Value::Object(op) => {
                let mut entries = op.iter();
                let (op_name, operand) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => return Err(SchemaError::InvalidPredicate(name.clone())),
                };
                compile_op(name, op_name, operand, &mut parts, &mut params)?;
            }
            scalar => {
                parts.push(format!("{} = ?", quote_ident(name)));
                params.push(scalar.clone());
            }
        }
    }

    Ok(Compiled {
        clause: parts.join(" AND "),
        params,
    })
}

fn compile_op(
    name: &str,
    op: &str,
    operand: &Value,
    parts: &mut Vec<String>,
    params: &mut Vec<Value>,
) -> Result<(), SchemaError> {
    let column = quote_ident(name);
    let symbol = match op.to_ascii_lowercase().as_str() {
        "eq" => "=",
        "lt" => "<",
        "gt" => ">",
        "le" => "<=",
        "ge" => ">=",
        "ne" => "!=",
        "between" => {
            // Both bounds inclusive.
            let bounds = match operand {
                Value::Array(b) if b.len() == 2 => b,
                _ => return Err(SchemaError::InvalidPredicate(name.to_string())),
            };
            parts.push(format!("{column} >= ? AND {column} <= ?"));
            params.push(bounds[0].clone());
            params.push(bounds[1].clone());
            return Ok(());
        }
        other => return Err(SchemaError::UnknownOperator(other.to_string())),
    };

    parts.push(format!("{column} {symbol} ?"));
    params.push(operand.clone());
    Ok(())
}
