//! DDL planning: keyspace creation, column families with clustering order and
//! compaction options, and keyspace teardown.

use crate::driver::Statement;
use crate::request::TableOptions;
use crate::schema::{SchemaError, TableSchema, quote_ident};

use super::table_ref;

const DEFAULT_STORAGE_CLASS: &str = "SimpleStrategy";
const DEFAULT_REPLICATION_FACTOR: u32 = 3;

/// Compile the CREATE KEYSPACE statement for `keyspace`.
///
/// DDL cannot bind parameters, so the replication class is validated against
/// an identifier charset before interpolation.
pub fn create_keyspace(
    keyspace: &str,
    options: &TableOptions,
) -> Result<Statement, SchemaError> {
    let class = options
        .storage_class
        .as_deref()
        .unwrap_or(DEFAULT_STORAGE_CLASS);
    if class.is_empty()
        || !class
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_')
    {
        return Err(SchemaError::InvalidReplicationClass(class.to_string()));
    }
    let factor = options
        .replication_factor
        .unwrap_or(DEFAULT_REPLICATION_FACTOR);
    Ok(Statement::new(
        format!(
            "CREATE KEYSPACE {} WITH REPLICATION = {{ 'class': '{class}', 'replication_factor': {factor} }}",
            quote_ident(keyspace)
        ),
        Vec::new(),
    ))
}

/// Compile the CREATE TABLE statement for one column family.
pub fn create_family(keyspace: &str, family: &str, schema: &TableSchema) -> Statement {
    let mut columns = Vec::with_capacity(schema.attributes.len());
    for (name, ty) in &schema.attributes {
        let mut column = format!("{} {}", quote_ident(name), ty.physical());
        if schema.index.statics.contains(name) {
            column.push_str(" STATIC");
        }
        columns.push(column);
    }

    let key = schema
        .index_attributes
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut query = format!(
        "CREATE TABLE {} ({}, PRIMARY KEY ({})) WITH compaction = {{ 'class' : 'LeveledCompactionStrategy' }}",
        table_ref(keyspace, family),
        columns.join(", "),
        key
    );

    let ordered: Vec<String> = schema
        .index
        .range
        .iter()
        .zip(schema.index.order.iter())
        .map(|(column, dir)| format!("{} {dir}", quote_ident(column)))
        .collect();
    if !ordered.is_empty() {
        query.push_str(&format!(" AND CLUSTERING ORDER BY ({})", ordered.join(", ")));
    }

    Statement::new(query, Vec::new())
}

/// Compile the DROP KEYSPACE statement for `keyspace`.
pub fn drop_keyspace(keyspace: &str) -> Statement {
    Statement::new(format!("DROP KEYSPACE {}", quote_ident(keyspace)), Vec::new())
}
