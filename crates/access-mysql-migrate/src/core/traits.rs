//! Store traits for database-agnostic migration.
//!
//! The engine and orchestrator only ever talk to these two traits; the
//! concrete ODBC and MySQL drivers live in `source` and `target`. Connection
//! descriptors are owned by the caller's configuration, not by the core.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::schema::{CatalogEntry, Column, Table};
use super::value::RowBatch;

/// Read catalog, schema, and row data from the source store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// List all tables in the source catalog, including system entries.
    ///
    /// Returns an empty list (not an error) when the catalog is empty;
    /// the caller decides whether that is fatal.
    async fn list_tables(&self) -> Result<Vec<CatalogEntry>>;

    /// Fetch column metadata for one table without materializing row data.
    ///
    /// Must be O(columns), not O(rows): implementations issue a schema-only
    /// query (zero-row result set) and read its metadata.
    async fn table_schema(&self, table_name: &str) -> Result<Vec<Column>>;

    /// Start streaming rows from a table in column-ordinal order.
    ///
    /// Returns a bounded channel receiver yielding batches of rows; the
    /// reader runs in the background and blocks when the channel fills,
    /// giving backpressure. Errors (including cursor setup failures) arrive
    /// through the channel.
    fn stream_rows(&self, table: &Table, batch_size: usize) -> mpsc::Receiver<Result<RowBatch>>;

    /// Close the source connection.
    async fn close(&self);
}

/// Write schema and data to the target store.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Check whether a table exists, via a catalog lookup.
    ///
    /// Existence is never probed with a failing CREATE; control flow does
    /// not rely on error codes.
    async fn table_exists(&self, table_name: &str) -> Result<bool>;

    /// Create a table whose columns mirror the descriptor in source order.
    async fn create_table(&self, table: &Table) -> Result<()>;

    /// Delete all rows from an existing table.
    async fn truncate_table(&self, table_name: &str) -> Result<()>;

    /// Insert a batch of rows as a single statement.
    ///
    /// All values are positionally bound. The statement is atomic: on error
    /// no row from the batch is written, so the caller may re-drive the same
    /// rows individually.
    async fn insert_rows(&self, table: &Table, rows: &[crate::core::value::Row]) -> Result<u64>;

    /// Insert one row with positionally bound parameters.
    async fn insert_row(&self, table: &Table, row: &crate::core::value::Row) -> Result<()>;

    /// Close the target connection.
    async fn close(&self);
}
