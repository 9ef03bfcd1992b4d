//! Read planning: projection, predicate, ordering, and limit.

use serde_json::Value;

use crate::driver::Statement;
use crate::predicate;
use crate::request::ReadRequest;
use crate::schema::{SchemaError, TID_COLUMN, TableSchema, quote_ident};
use crate::types::SortOrder;

use super::table_ref;

/// Compile a read against `keyspace`.`family` into a SELECT statement.
///
/// `schema` is the primary table's enriched schema when one is known; reads
/// issued before a schema document exists (including the internal `meta`
/// read) pass `None`.
pub fn build(
    keyspace: &str,
    family: &str,
    schema: Option<&TableSchema>,
    request: &ReadRequest,
) -> Result<Statement, SchemaError> {
    // Resolve the schema of the family actually being read.
    let target = match (&request.index, schema) {
        (Some(name), Some(primary)) => primary.index_schemas.get(name),
        (None, Some(primary)) => Some(primary),
        _ => None,
    };

    // Ordering targets the first clustering column; without a schema the
    // implicit `_tid` column is assumed.
    let direction = request.order.as_deref().and_then(SortOrder::parse);
    let order_by = direction.and_then(|dir| match target {
        Some(schema) => schema
            .index
            .range
            .first()
            .map(|column| (column.clone(), dir)),
        None => Some((TID_COLUMN.to_string(), dir)),
    });

    // The underlying engine rejects ORDER BY combined with `*`, so the
    // wildcard is expanded to the full attribute list when possible.
    let projection = match (&request.proj, &order_by, target) {
        (Some(proj), _, _) => quoted_list(proj.names()),
        (None, Some(_), Some(schema)) => {
            quoted_list(schema.attributes.keys().map(String::as_str))
        }
        (None, _, _) => "*".to_string(),
    };

    let mut query = format!(
        "SELECT {}{} FROM {}",
        if request.distinct { "distinct " } else { "" },
        projection,
        table_ref(keyspace, family)
    );
    let mut params = Vec::new();

    if let Some(attributes) = request.attributes.as_ref().filter(|a| !a.is_empty()) {
        let compiled = predicate::compile(attributes)?;
        query.push_str(" WHERE ");
        query.push_str(&compiled.clause);
        params = compiled.params;
    }

    if let Some((column, dir)) = order_by {
        query.push_str(&format!(" ORDER BY {} {dir}", quote_ident(&column)));
    }

    if let Some(limit) = request.limit.as_ref().and_then(Value::as_u64) {
        query.push_str(" LIMIT ?");
        params.push(Value::from(limit));
    }

    Ok(Statement::new(query, params))
}

fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(",")
}
