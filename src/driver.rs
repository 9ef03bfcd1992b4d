//! Contract between the store and the underlying database driver.
//!
//! The store composes parameterised statements and hands them to a [`Driver`]
//! for execution; connection pooling, prepared-statement caching, retries, and
//! cancellation all live behind this seam.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// A single parameterised wire statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub query: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }
}

/// Tunable consistency for a statement or batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    #[default]
    One,
    LocalQuorum,
    All,
}

impl Consistency {
    /// Map a request-supplied consistency name. Anything other than `all`
    /// or `localQuorum` (including absence) falls back to `One`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("all") => Consistency::All,
            Some("localQuorum") => Consistency::LocalQuorum,
            _ => Consistency::One,
        }
    }
}

/// Execution options forwarded with every driver call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub consistency: Consistency,
    pub prepared: bool,
}

impl ExecOptions {
    /// Mark the statement for prepared execution.
    pub fn prepared(mut self) -> Self {
        self.prepared = true;
        self
    }
}

/// A result row: column name to JSON-friendly value.
pub type Row = BTreeMap<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("driver: {0}")]
    Backend(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the store requires from the database driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute a single statement and return its result rows.
    async fn execute(
        &self,
        statement: &Statement,
        options: ExecOptions,
    ) -> Result<Vec<Row>, DriverError>;

    /// Execute a set of statements as one best-effort atomic batch.
    async fn batch(
        &self,
        statements: &[Statement],
        options: ExecOptions,
    ) -> Result<(), DriverError>;
}

#[async_trait]
impl Driver for Box<dyn Driver> {
    async fn execute(
        &self,
        statement: &Statement,
        options: ExecOptions,
    ) -> Result<Vec<Row>, DriverError> {
        (**self).execute(statement, options).await
    }

    async fn batch(
        &self,
        statements: &[Statement],
        options: ExecOptions,
    ) -> Result<(), DriverError> {
        (**self).batch(statements, options).await
    }
}

#[async_trait]
impl Driver for Arc<dyn Driver> {
    async fn execute(
        &self,
        statement: &Statement,
        options: ExecOptions,
    ) -> Result<Vec<Row>, DriverError> {
        (**self).execute(statement, options).await
    }

    async fn batch(
        &self,
        statements: &[Statement],
        options: ExecOptions,
    ) -> Result<(), DriverError> {
        (**self).batch(statements, options).await
    }
}
