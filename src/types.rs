//! Logical attribute types and their physical column mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaError;

/// Scalar logical types understood by the schema language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Blob,
    Decimal,
    Double,
    Boolean,
    Varint,
    String,
    Timeuuid,
    Uuid,
    Timestamp,
    Json,
}

impl ScalarType {
    fn name(&self) -> &'static str {
        match self {
            ScalarType::Blob => "blob",
            ScalarType::Decimal => "decimal",
            ScalarType::Double => "double",
            ScalarType::Boolean => "boolean",
            ScalarType::Varint => "varint",
            ScalarType::String => "string",
            ScalarType::Timeuuid => "timeuuid",
            ScalarType::Uuid => "uuid",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Json => "json",
        }
    }

    /// Physical column type. `string` and `json` are both stored as `text`;
    /// `json` values are serialized by the write planner before binding.
    pub fn physical(&self) -> &'static str {
        match self {
            ScalarType::String | ScalarType::Json => "text",
            other => other.name(),
        }
    }
}

impl FromStr for ScalarType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(ScalarType::Blob),
            "decimal" => Ok(ScalarType::Decimal),
            "double" => Ok(ScalarType::Double),
            "boolean" => Ok(ScalarType::Boolean),
            "varint" => Ok(ScalarType::Varint),
            "string" => Ok(ScalarType::String),
            "timeuuid" => Ok(ScalarType::Timeuuid),
            "uuid" => Ok(ScalarType::Uuid),
            "timestamp" => Ok(ScalarType::Timestamp),
            "json" => Ok(ScalarType::Json),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

/// A logical attribute type: a scalar or a set of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogicalType {
    Scalar(ScalarType),
    Set(ScalarType),
}

impl LogicalType {
    /// Physical column type for DDL emission.
    pub fn physical(&self) -> String {
        match self {
            LogicalType::Scalar(s) => s.physical().to_string(),
            LogicalType::Set(s) => format!("set<{}>", s.physical()),
        }
    }

    pub fn is_timeuuid(&self) -> bool {
        matches!(self, LogicalType::Scalar(ScalarType::Timeuuid))
    }
}

impl FromStr for LogicalType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = s.strip_prefix("set<").and_then(|r| r.strip_suffix('>')) {
            return Ok(LogicalType::Set(inner.parse()?));
        }
        Ok(LogicalType::Scalar(s.parse()?))
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Scalar(s) => write!(f, "{}", s.name()),
            LogicalType::Set(s) => write!(f, "set<{}>", s.name()),
        }
    }
}

impl TryFrom<String> for LogicalType {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LogicalType> for String {
    fn from(t: LogicalType) -> Self {
        t.to_string()
    }
}

/// Sort direction for a clustering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a request-supplied direction. Anything other than `asc`/`desc`
    /// yields `None` so callers can drop the ordering.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}
