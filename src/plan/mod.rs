//! Statement planners translating requests into parameterised wire
//! statements.

pub mod ddl;
pub mod delete;
pub mod read;
pub mod write;

use crate::schema::quote_ident;

/// Fully-qualified column family reference.
pub(crate) fn table_ref(keyspace: &str, family: &str) -> String {
    format!("{}.{}", quote_ident(keyspace), quote_ident(family))
}
