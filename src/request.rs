//! JSON-friendly request and response shapes for the public operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::Row;
use crate::schema::TableSchema;

/// Options controlling keyspace creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableOptions {
    /// Replication strategy class. Defaults to `SimpleStrategy`.
    #[serde(default, rename = "storageClass")]
    pub storage_class: Option<String>,
    /// Replication factor. Defaults to 3. `durabilityLevel` is accepted as a
    /// legacy alias.
    #[serde(
        default,
        rename = "replicationFactor",
        alias = "durabilityLevel"
    )]
    pub replication_factor: Option<u32>,
}

/// Request body for `create_table`.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRequest {
    pub table: String,
    #[serde(default)]
    pub options: TableOptions,
    #[serde(flatten)]
    pub schema: TableSchema,
}

/// Projection: a single attribute name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Projection {
    One(String),
    Many(Vec<String>),
}

impl Projection {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Projection::One(name) => vec![name.as_str()],
            Projection::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Request body for `get`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadRequest {
    pub table: String,
    /// Secondary index to read instead of the primary table.
    #[serde(default)]
    pub index: Option<String>,
    /// Predicate over attributes; see the predicate compiler for operators.
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub proj: Option<Projection>,
    /// `asc` or `desc`; anything else is dropped.
    #[serde(default)]
    pub order: Option<String>,
    /// Row limit; non-numeric values are dropped.
    #[serde(default)]
    pub limit: Option<Value>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub consistency: Option<String>,
}

/// Request body for `put`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteRequest {
    pub table: String,
    pub attributes: BTreeMap<String, Value>,
    /// Compare-and-set guard: the string `"not exists"` or a predicate
    /// object.
    #[serde(default, rename = "if")]
    pub condition: Option<Value>,
    #[serde(default)]
    pub consistency: Option<String>,
}

/// Request body for `delete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    pub table: String,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub consistency: Option<String>,
}

/// Result of a `get`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadResponse {
    pub count: usize,
    pub items: Vec<Row>,
}

/// Result of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteResponse {
    pub status: u16,
}
