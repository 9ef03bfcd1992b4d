//! Delete planning.
//!
//! A delete always targets the primary family; companion rows are removed in
//! the same batch whenever the predicate is expressible against the
//! companion's key columns. Companions the predicate cannot address are left
//! to the `__tombstone` reconciliation sweep.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::driver::Statement;
use crate::predicate;
use crate::request::DeleteRequest;
use crate::schema::{DATA_FAMILY, SchemaError, TableSchema, index_family};

use super::table_ref;

/// Compile a delete into the primary statement plus one per coverable
/// companion.
pub fn statements(
    keyspace: &str,
    schema: Option<&TableSchema>,
    request: &DeleteRequest,
) -> Result<Vec<Statement>, SchemaError> {
    let empty = BTreeMap::new();
    let attributes = request.attributes.as_ref().unwrap_or(&empty);

    let mut out = vec![family_statement(keyspace, DATA_FAMILY, attributes)?];
    if let Some(schema) = schema {
        for (name, companion) in &schema.index_schemas {
            let coverable = attributes
                .keys()
                .all(|attr| companion.index_attributes.contains(attr));
            if coverable {
                out.push(family_statement(keyspace, &index_family(name), attributes)?);
            }
        }
    }
    Ok(out)
}

fn family_statement(
    keyspace: &str,
    family: &str,
    attributes: &BTreeMap<String, Value>,
) -> Result<Statement, SchemaError> {
    let mut query = format!("DELETE FROM {}", table_ref(keyspace, family));
    let mut params = Vec::new();
    if !attributes.is_empty() {
        let compiled = predicate::compile(attributes)?;
        query.push_str(" WHERE ");
        query.push_str(&compiled.clause);
        params = compiled.params;
    }
    Ok(Statement::new(query, params))
}
