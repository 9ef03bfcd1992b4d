//! Document-oriented table storage over a wide-column clustered database.
//!
//! Tables are addressed by a reverse-DNS domain plus a table name, which
//! together derive a physical keyspace. Each keyspace holds a `data` family,
//! a `meta` family with the schema document, and one `i_<name>` companion
//! family per secondary index. Requests are JSON-friendly objects compiled
//! into parameterised statements and executed through a [`Driver`].

pub mod driver;
pub mod error;
pub mod keyspace;
pub mod plan;
pub mod predicate;
pub mod request;
pub mod schema;
pub mod types;

pub use driver::{Consistency, Driver, DriverError, ExecOptions, Row, Statement};
pub use error::Error;
pub use request::{
    DeleteRequest, ReadRequest, ReadResponse, SchemaRequest, TableOptions, WriteRequest,
    WriteResponse,
};
pub use schema::{SchemaError, TableSchema};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use schema::{DATA_FAMILY, META_FAMILY, SCHEMA_KEY, index_family};

/// Store-wide configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Consistency applied when a request does not specify one.
    pub default_consistency: Consistency,
}

/// Document-table store layered over a [`Driver`].
///
/// Parsed schemas are cached per keyspace. Schemas are immutable once
/// created, so cache entries are only ever written once; concurrent loads of
/// the same keyspace all compute the same value and the last writer wins.
pub struct Store<D: Driver> {
    driver: D,
    config: Config,
    schemas: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl<D: Driver> Store<D> {
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, Config::default())
    }

    pub fn with_config(driver: D, config: Config) -> Self {
        Self {
            driver,
            config,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Create the keyspace for `(reverse_domain, req.table)`: the `data` and
    /// `meta` families, one companion family per secondary index, and the
    /// persisted schema document.
    pub async fn create_table(
        &self,
        reverse_domain: &str,
        request: &SchemaRequest,
    ) -> Result<(), Error> {
        let ks = keyspace::keyspace_name(reverse_domain, &request.table);
        let mut schema = request.schema.clone();
        schema.enrich()?;

        let options = self.options(None);
        info!(keyspace = %ks, "creating keyspace");
        self.driver
            .execute(&plan::ddl::create_keyspace(&ks, &request.options)?, options)
            .await?;

        let data = plan::ddl::create_family(&ks, DATA_FAMILY, &schema);
        let meta = plan::ddl::create_family(&ks, META_FAMILY, &schema::meta_schema());
        tokio::try_join!(
            self.driver.execute(&data, options),
            self.driver.execute(&meta, options),
        )?;
        for (name, companion) in &schema.index_schemas {
            let statement = plan::ddl::create_family(&ks, &index_family(name), companion);
            self.driver.execute(&statement, options).await?;
        }

        let document =
            serde_json::to_string(&request.schema).map_err(SchemaError::Document)?;
        let mut attributes = BTreeMap::new();
        attributes.insert("key".to_string(), Value::String(SCHEMA_KEY.to_string()));
        attributes.insert("value".to_string(), Value::String(document));
        let persist = plan::write::family_statement(
            &ks,
            META_FAMILY,
            &schema::meta_schema(),
            &attributes,
            None,
            false,
        )?;
        self.driver
            .execute(&persist, self.options(None).prepared())
            .await?;

        self.schemas.write().await.insert(ks, Arc::new(schema));
        Ok(())
    }

    /// Drop the keyspace for `(reverse_domain, table)`.
    pub async fn drop_table(&self, reverse_domain: &str, table: &str) -> Result<(), Error> {
        let ks = keyspace::keyspace_name(reverse_domain, table);
        info!(keyspace = %ks, "dropping keyspace");
        self.driver
            .execute(&plan::ddl::drop_keyspace(&ks), self.options(None))
            .await?;
        self.schemas.write().await.remove(&ks);
        Ok(())
    }

    /// Read rows from the primary table or a secondary index.
    pub async fn get(
        &self,
        reverse_domain: &str,
        request: &ReadRequest,
    ) -> Result<ReadResponse, Error> {
        let ks = keyspace::keyspace_name(reverse_domain, &request.table);
        let schema = self.cached_or_load(&ks).await?;
        let family = match &request.index {
            Some(name) => index_family(name),
            None => DATA_FAMILY.to_string(),
        };
        let statement = plan::read::build(&ks, &family, schema.as_deref(), request)?;
        let options = self.options(request.consistency.as_deref()).prepared();
        debug!(keyspace = %ks, query = %statement.query, "get");
        let rows = self.driver.execute(&statement, options).await?;
        let items: Vec<Row> = rows.into_iter().map(strip_internal).collect();
        Ok(ReadResponse {
            count: items.len(),
            items,
        })
    }

    /// Write a row to the primary table and every secondary-index companion.
    ///
    /// Unconditional writes fan out as one batch. A conditional write runs
    /// the primary statement alone first so the engine's `[applied]` result
    /// is observable; companions are only written once the condition holds.
    pub async fn put(
        &self,
        reverse_domain: &str,
        request: &WriteRequest,
    ) -> Result<WriteResponse, Error> {
        let ks = keyspace::keyspace_name(reverse_domain, &request.table);
        let schema = self
            .cached_or_load(&ks)
            .await?
            .ok_or_else(|| Error::NotFound(ks.clone()))?;
        let statements = plan::write::statements(&ks, &schema, request)?;
        let options = self.options(request.consistency.as_deref()).prepared();
        debug!(keyspace = %ks, statements = statements.len(), "put");

        if request.condition.is_some() {
            let rows = self.driver.execute(&statements[0], options).await?;
            if let Some(row) = rows.into_iter().next() {
                if row.get("[applied]") == Some(&Value::Bool(false)) {
                    return Err(Error::ConditionNotMet(row));
                }
            }
            match statements.len() {
                1 => {}
                2 => {
                    self.driver.execute(&statements[1], options).await?;
                }
                _ => self.driver.batch(&statements[1..], options).await?,
            }
        } else if statements.len() == 1 {
            self.driver.execute(&statements[0], options).await?;
        } else {
            self.driver.batch(&statements, options).await?;
        }
        Ok(WriteResponse { status: 201 })
    }

    /// Delete rows matching the request predicate from the primary table and
    /// every companion the predicate can address.
    pub async fn delete(
        &self,
        reverse_domain: &str,
        request: &DeleteRequest,
    ) -> Result<(), Error> {
        let ks = keyspace::keyspace_name(reverse_domain, &request.table);
        let schema = self.cached_or_load(&ks).await?;
        let statements = plan::delete::statements(&ks, schema.as_deref(), request)?;
        let options = self.options(request.consistency.as_deref()).prepared();
        debug!(keyspace = %ks, statements = statements.len(), "delete");
        if statements.len() == 1 {
            self.driver.execute(&statements[0], options).await?;
        } else {
            self.driver.batch(&statements, options).await?;
        }
        Ok(())
    }

    /// Return the enriched schema for `(reverse_domain, table)`.
    pub async fn schema(
        &self,
        reverse_domain: &str,
        table: &str,
    ) -> Result<Arc<TableSchema>, Error> {
        let ks = keyspace::keyspace_name(reverse_domain, table);
        self.cached_or_load(&ks)
            .await?
            .ok_or_else(|| Error::NotFound(ks))
    }

    async fn cached_or_load(&self, ks: &str) -> Result<Option<Arc<TableSchema>>, Error> {
        if let Some(schema) = self.schemas.read().await.get(ks) {
            return Ok(Some(schema.clone()));
        }
        let Some(schema) = self.load_schema(ks).await? else {
            return Ok(None);
        };
        let schema = Arc::new(schema);
        self.schemas
            .write()
            .await
            .insert(ks.to_string(), schema.clone());
        Ok(Some(schema))
    }

    /// Fetch and parse the schema document from the keyspace's `meta` family.
    async fn load_schema(&self, ks: &str) -> Result<Option<TableSchema>, Error> {
        let mut attributes = BTreeMap::new();
        attributes.insert("key".to_string(), Value::String(SCHEMA_KEY.to_string()));
        let request = ReadRequest {
            attributes: Some(attributes),
            ..ReadRequest::default()
        };
        let statement = plan::read::build(ks, META_FAMILY, None, &request)?;
        let rows = self
            .driver
            .execute(&statement, self.options(None).prepared())
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let document = match row.get("value") {
            Some(Value::String(document)) => document,
            _ => {
                return Err(SchemaError::InvalidDocument(
                    "missing value column".to_string(),
                )
                .into());
            }
        };
        let schema = TableSchema::parse(document)?;
        debug!(keyspace = %ks, "schema loaded");
        Ok(Some(schema))
    }

    fn options(&self, requested: Option<&str>) -> ExecOptions {
        let consistency = match requested {
            Some(value) => Consistency::parse(Some(value)),
            None => self.config.default_consistency,
        };
        ExecOptions {
            consistency,
            prepared: false,
        }
    }
}

// Engine-internal columns (e.g. `[applied]`) never surface in responses.
fn strip_internal(mut row: Row) -> Row {
    row.retain(|name, _| !name.starts_with('['));
    row
}
