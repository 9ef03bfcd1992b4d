//! Write planning: insert-or-update decisioning, compare-and-set guards, and
//! secondary-index fan-out.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::{NoContext, Timestamp, Uuid};

use crate::driver::Statement;
use crate::predicate;
use crate::request::WriteRequest;
use crate::schema::{
    DATA_FAMILY, SchemaError, TID_COLUMN, TableSchema, index_family, quote_ident,
};

use super::table_ref;

// Fixed node id for synthesized `_tid` values; the timestamp carries all the
// ordering information.
const TID_NODE: [u8; 6] = [0, 0, 0, 0, 0, 0];

/// Synthesize a time-based (v1) UUID for the current wall-clock time.
pub fn new_tid() -> Uuid {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let ts = Timestamp::from_unix(NoContext, now.as_secs(), now.subsec_nanos());
    Uuid::new_v1(ts, &TID_NODE)
}

/// The parsed compare-and-set guard of a write.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    NotExists,
    Predicate(BTreeMap<String, Value>),
}

impl Condition {
    /// Parse the request's `if` value: the string `"not exists"`
    /// (case-insensitive, whitespace-normalised) or a predicate object.
    pub fn parse(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) => {
                let normalised = s
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_ascii_lowercase();
                if normalised == "not exists" {
                    Ok(Condition::NotExists)
                } else {
                    Err(SchemaError::InvalidCondition)
                }
            }
            Value::Object(map) => Ok(Condition::Predicate(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => Err(SchemaError::InvalidCondition),
        }
    }
}

/// Compile a write into the primary statement plus one statement per
/// secondary-index companion, in that order.
///
/// All statements share one synthesized `_tid` where needed, so companion
/// rows stay addressable from the primary row's write.
pub fn statements(
    keyspace: &str,
    schema: &TableSchema,
    request: &WriteRequest,
) -> Result<Vec<Statement>, SchemaError> {
    for name in request.attributes.keys() {
        if !schema.attributes.contains_key(name) && name != TID_COLUMN {
            return Err(SchemaError::UndeclaredAttribute(name.clone()));
        }
    }

    let mut attributes = request.attributes.clone();
    let needs_tid = std::iter::once(schema)
        .chain(schema.index_schemas.values())
        .any(|s| s.index_attributes.iter().any(|k| k == TID_COLUMN));
    if needs_tid && !attributes.contains_key(TID_COLUMN) {
        attributes.insert(
            TID_COLUMN.to_string(),
            Value::String(new_tid().to_string()),
        );
    }

    let condition = request.condition.as_ref().map(Condition::parse).transpose()?;

    let mut out = Vec::with_capacity(1 + schema.index_schemas.len());
    out.push(family_statement(
        keyspace,
        DATA_FAMILY,
        schema,
        &attributes,
        condition.as_ref(),
        true,
    )?);
    for (name, companion) in &schema.index_schemas {
        // Conditions are evaluated on the primary table only; the engine
        // cannot guard a batch across column families.
        out.push(family_statement(
            keyspace,
            &index_family(name),
            companion,
            &attributes,
            condition.as_ref(),
            false,
        )?);
    }
    Ok(out)
}

/// Compile the statement for a single column family.
///
/// Key values bind in `index_attributes` order. Writes carrying no non-key
/// attributes, and all `IF NOT EXISTS` writes, take the INSERT shape with
/// keys bound first; everything else is an UPDATE binding the assigned
/// values first.
pub fn family_statement(
    keyspace: &str,
    family: &str,
    schema: &TableSchema,
    attributes: &BTreeMap<String, Value>,
    condition: Option<&Condition>,
    carry_condition: bool,
) -> Result<Statement, SchemaError> {
    let mut keys = Vec::with_capacity(schema.index_attributes.len());
    for name in &schema.index_attributes {
        match attributes.get(name) {
            Some(value) => keys.push((name.as_str(), value.clone())),
            None => return Err(SchemaError::MissingIndexAttribute(name.clone())),
        }
    }

    let values: Vec<(&str, Value)> = attributes
        .iter()
        .filter(|(name, _)| {
            schema.attributes.contains_key(*name) && !schema.index_attributes.contains(*name)
        })
        .map(|(name, value)| (name.as_str(), json_encode(value)))
        .collect();

    let insert = values.is_empty() || matches!(condition, Some(Condition::NotExists));
    let target = table_ref(keyspace, family);
    let mut params;
    let mut query;

    if insert {
        let columns: Vec<&str> = keys
            .iter()
            .chain(values.iter())
            .map(|(name, _)| *name)
            .collect();
        let marks = vec!["?"; columns.len()].join(",");
        query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            target,
            columns
                .iter()
                .map(|name| quote_ident(name))
                .collect::<Vec<_>>()
                .join(","),
            marks
        );
        params = Vec::with_capacity(columns.len());
        params.extend(keys.into_iter().map(|(_, value)| value));
        params.extend(values.into_iter().map(|(_, value)| value));
    } else {
        let assignments = values
            .iter()
            .map(|(name, _)| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let guards = keys
            .iter()
            .map(|(name, _)| format!("{} = ?", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(" AND ");
        query = format!("UPDATE {target} SET {assignments} WHERE {guards}");
        params = Vec::with_capacity(values.len() + keys.len());
        params.extend(values.into_iter().map(|(_, value)| value));
        params.extend(keys.into_iter().map(|(_, value)| value));
    }

    if carry_condition {
        match condition {
            Some(Condition::NotExists) => query.push_str(" IF NOT EXISTS"),
            Some(Condition::Predicate(guard)) => {
                let compiled = predicate::compile(guard)?;
                query.push_str(" IF ");
                query.push_str(&compiled.clause);
                params.extend(compiled.params);
            }
            None => {}
        }
    }

    Ok(Statement::new(query, params))
}

// Nested object values are stored as JSON text.
fn json_encode(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}
