#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tablestore::{Driver, DriverError, ExecOptions, Row, Statement, Store};

/// Driver double recording every dispatched statement and batch, replaying
/// queued row responses for `execute`.
#[derive(Default)]
pub struct RecordingDriver {
    pub executed: Mutex<Vec<(Statement, ExecOptions)>>,
    pub batches: Mutex<Vec<(Vec<Statement>, ExecOptions)>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next `execute` call. Calls with no
    /// queued response return no rows.
    pub fn respond(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(rows);
    }

    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(statement, _)| statement.query.clone())
            .collect()
    }

    pub fn executed_statements(&self) -> Vec<Statement> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(statement, _)| statement.clone())
            .collect()
    }

    pub fn batched(&self) -> Vec<Vec<Statement>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(statements, _)| statements.clone())
            .collect()
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn execute(
        &self,
        statement: &Statement,
        options: ExecOptions,
    ) -> Result<Vec<Row>, DriverError> {
        self.executed
            .lock()
            .unwrap()
            .push((statement.clone(), options));
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn batch(
        &self,
        statements: &[Statement],
        options: ExecOptions,
    ) -> Result<(), DriverError> {
        self.batches
            .lock()
            .unwrap()
            .push((statements.to_vec(), options));
        Ok(())
    }
}

/// A store backed by a shared [`RecordingDriver`].
pub fn store() -> (Arc<RecordingDriver>, Store<Arc<dyn Driver>>) {
    let driver = Arc::new(RecordingDriver::new());
    let as_dyn: Arc<dyn Driver> = driver.clone();
    (driver, Store::new(as_dyn))
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}
