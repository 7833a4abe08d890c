//! Store adapter
//!
//! [`Store`] is the interface the pipeline needs from the analytics store.
//! [`ClickHouseStore`] implements it over the ClickHouse HTTP interface.

use crate::Source;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

pub mod clickhouse;
pub mod schema;

pub use clickhouse::ClickHouseStore;
pub use schema::{EnginePolicy, TableSchema};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Non-200 response
    #[error("store returned HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Request could not be sent or the body could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Store answered with something that could not be interpreted
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// No column type is configured for a requested field
    #[error("no column type configured for field {0}")]
    UnknownFieldType(String),

    /// Store client could not be built
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the pipeline requires from the analytics store
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether the target database exists
    async fn database_exists(&self) -> StoreResult<bool>;

    /// Create the target database
    async fn create_database(&self) -> StoreResult<()>;

    /// Whether the table for `source` exists
    async fn table_exists(&self, source: Source) -> StoreResult<bool>;

    /// Create the table for `source` with columns for `fields`
    async fn create_table(&self, source: Source, fields: &[String]) -> StoreResult<()>;

    /// Bulk-load a header-labeled tab-separated payload
    async fn load(&self, source: Source, payload: &str) -> StoreResult<()>;

    /// Rows whose date lies within `[start, end]`
    async fn row_count_in_range(
        &self,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<u64>;
}

/// Create the database and the table for `source` when missing
pub async fn ensure_schema(store: &dyn Store, source: Source, fields: &[String]) -> StoreResult<()> {
    if !store.database_exists().await? {
        store.create_database().await?;
        info!("Database created");
    }

    if !store.table_exists(source).await? {
        store.create_table(source, fields).await?;
        info!("Table created for {}", source);
    }

    Ok(())
}

/// Whether the store already holds rows for `[start, end]`
///
/// A missing database or table means no data, not an error.
pub async fn data_present(
    store: &dyn Store,
    source: Source,
    start: NaiveDate,
    end: NaiveDate,
) -> StoreResult<bool> {
    if !store.database_exists().await? {
        return Ok(false);
    }
    if !store.table_exists(source).await? {
        return Ok(false);
    }
    Ok(store.row_count_in_range(source, start, end).await? > 0)
}
