//! Top-level error type for store operations.

use crate::driver::{DriverError, Row};
use crate::schema::SchemaError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The schema document for a keyspace is absent.
    #[error("no schema for keyspace {0}")]
    NotFound(String),
    /// A conditional write was not applied. Carries the row returned by the
    /// engine alongside `[applied]`.
    #[error("write condition not met")]
    ConditionNotMet(Row),
    #[error(transparent)]
    Driver(#[from] DriverError),
}
