//! Logical schema documents and the physical layout derived from them.
//!
//! A schema names its attributes and primary index, plus any secondary
//! indexes. Each secondary index materialises as a companion column family
//! whose key columns are a superset of the primary key, so companion rows can
//! always be addressed alongside the primary row.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{LogicalType, ScalarType, SortOrder};

/// Primary column family name.
pub const DATA_FAMILY: &str = "data";
/// Per-keyspace metadata family holding the schema document.
pub const META_FAMILY: &str = "meta";
/// Key the schema document is stored under in `meta`.
pub const SCHEMA_KEY: &str = "schema";
/// Implicit timeuuid clustering column appended to companions that would
/// otherwise have none.
pub const TID_COLUMN: &str = "_tid";
/// Static companion column recording how far the index has been reconciled.
pub const CONSISTENT_UP_TO: &str = "__consistentUpTo";
/// Companion column marking rows awaiting a reconciliation sweep.
pub const TOMBSTONE: &str = "__tombstone";

/// Physical family name for a secondary index.
pub fn index_family(name: &str) -> String {
    format!("i_{name}")
}

/// Quote a name for embedding in a statement as an identifier, doubling any
/// embedded quote per the engine's quoting rules. Schema-declared names are
/// additionally rejected outright by [`TableSchema::enrich`] when they carry
/// a quote.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("invalid predicate for {0}")]
    InvalidPredicate(String),
    #[error("invalid condition")]
    InvalidCondition,
    #[error("Index attribute {0} missing")]
    MissingIndexAttribute(String),
    #[error("{0} is not a declared attribute")]
    UndeclaredAttribute(String),
    #[error("invalid identifier {0}")]
    InvalidIdentifier(String),
    #[error("invalid replication class {0}")]
    InvalidReplicationClass(String),
    #[error("schema document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("invalid schema document: {0}")]
    InvalidDocument(String),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}

/// An index descriptor: partition column, clustering columns with their sort
/// order, static columns, and (for secondary indexes) extra projected
/// attributes.
///
/// `range`, `order`, `static`, and `proj` each accept a single value or an
/// array in the document form; they are normalized to arrays on parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Index {
    #[serde(default)]
    pub hash: String,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub range: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub order: Vec<SortOrder>,
    #[serde(
        default,
        rename = "static",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub statics: Vec<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub proj: Vec<String>,
}

impl Index {
    /// Ordered key columns: partition column followed by clustering columns.
    pub fn key_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(1 + self.range.len());
        columns.push(self.hash.clone());
        columns.extend(self.range.iter().cloned());
        columns
    }
}

/// A table schema document, as persisted in `meta`, plus the derived layout
/// computed by [`TableSchema::enrich`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableSchema {
    pub attributes: BTreeMap<String, LogicalType>,
    pub index: Index,
    #[serde(
        default,
        rename = "secondaryIndexes",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub secondary_indexes: BTreeMap<String, Index>,
    /// Attribute names that together identify a row, in binding order.
    #[serde(skip)]
    pub index_attributes: Vec<String>,
    /// Fully-synthesized companion schema per secondary index.
    #[serde(skip)]
    pub index_schemas: BTreeMap<String, TableSchema>,
}

impl TableSchema {
    /// Parse a persisted schema document and compute its derived layout.
    pub fn parse(document: &str) -> Result<Self, SchemaError> {
        let mut schema: TableSchema = serde_json::from_str(document)?;
        schema.enrich()?;
        Ok(schema)
    }

    /// Validate attribute references and compute `index_attributes` and every
    /// companion schema. Idempotent.
    pub fn enrich(&mut self) -> Result<(), SchemaError> {
        self.validate()?;
        self.index_attributes = self.index.key_columns();
        self.index_schemas.clear();
        for (name, descriptor) in &self.secondary_indexes {
            let companion = self.synthesize_companion(descriptor)?;
            self.index_schemas.insert(name.clone(), companion);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.index.hash.is_empty() {
            return Err(SchemaError::InvalidDocument(
                "index.hash is required".to_string(),
            ));
        }
        // Attribute and index names land in statement text as quoted
        // identifiers; a name carrying a quote never gets that far.
        for name in self.attributes.keys().chain(self.secondary_indexes.keys()) {
            if name.contains('"') {
                return Err(SchemaError::InvalidIdentifier(name.clone()));
            }
        }
        self.check_declared(&self.index)?;
        for descriptor in self.secondary_indexes.values() {
            self.check_declared(descriptor)?;
        }
        Ok(())
    }

    fn check_declared(&self, index: &Index) -> Result<(), SchemaError> {
        let referenced = std::iter::once(&index.hash)
            .chain(index.range.iter())
            .chain(index.statics.iter())
            .chain(index.proj.iter());
        for name in referenced {
            if !self.attributes.contains_key(name) {
                return Err(SchemaError::UndeclaredAttribute(name.clone()));
            }
        }
        Ok(())
    }

    /// Build the companion schema for one secondary-index descriptor.
    ///
    /// The companion's key columns close over the primary key so a companion
    /// row can be deleted alongside its primary row, and always include at
    /// least one `timeuuid` clustering column.
    fn synthesize_companion(&self, descriptor: &Index) -> Result<TableSchema, SchemaError> {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            CONSISTENT_UP_TO.to_string(),
            LogicalType::Scalar(ScalarType::Timeuuid),
        );
        attributes.insert(
            TOMBSTONE.to_string(),
            LogicalType::Scalar(ScalarType::Boolean),
        );

        let hash_type = self
            .attributes
            .get(&descriptor.hash)
            .ok_or_else(|| SchemaError::UndeclaredAttribute(descriptor.hash.clone()))?;
        attributes.insert(descriptor.hash.clone(), *hash_type);

        let mut range = descriptor.range.clone();
        if !attributes.contains_key(&self.index.hash) && !range.contains(&self.index.hash) {
            range.push(self.index.hash.clone());
        }
        for column in &self.index.range {
            if !attributes.contains_key(column) && !range.contains(column) {
                range.push(column.clone());
            }
        }

        for column in &range {
            let ty = self
                .attributes
                .get(column)
                .ok_or_else(|| SchemaError::UndeclaredAttribute(column.clone()))?;
            attributes.insert(column.clone(), *ty);
        }

        // Every companion needs a timeuuid clustering column;
        // `__consistentUpTo` is static and does not count.
        let has_timeuuid_clustering = range
            .iter()
            .any(|column| attributes.get(column).is_some_and(LogicalType::is_timeuuid));
        if !has_timeuuid_clustering {
            attributes.insert(
                TID_COLUMN.to_string(),
                LogicalType::Scalar(ScalarType::Timeuuid),
            );
            range.push(TID_COLUMN.to_string());
        }

        for projected in &descriptor.proj {
            let ty = self
                .attributes
                .get(projected)
                .ok_or_else(|| SchemaError::UndeclaredAttribute(projected.clone()))?;
            attributes.insert(projected.clone(), *ty);
        }

        let index = Index {
            hash: descriptor.hash.clone(),
            range,
            order: descriptor.order.clone(),
            statics: vec![CONSISTENT_UP_TO.to_string()],
            proj: descriptor.proj.clone(),
        };
        Ok(TableSchema {
            attributes,
            index_attributes: index.key_columns(),
            index,
            secondary_indexes: BTreeMap::new(),
            index_schemas: BTreeMap::new(),
        })
    }
}

/// Schema of the per-keyspace `meta` family: `key text PRIMARY KEY, value
/// text`, with the table's schema document stored under [`SCHEMA_KEY`].
pub fn meta_schema() -> TableSchema {
    let mut attributes = BTreeMap::new();
    attributes.insert("key".to_string(), LogicalType::Scalar(ScalarType::String));
    attributes.insert("value".to_string(), LogicalType::Scalar(ScalarType::String));
    let index = Index {
        hash: "key".to_string(),
        ..Index::default()
    };
    TableSchema {
        attributes,
        index_attributes: index.key_columns(),
        index,
        secondary_indexes: BTreeMap::new(),
        index_schemas: BTreeMap::new(),
    }
}
