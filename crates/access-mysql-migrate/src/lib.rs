//! # access-mysql-migrate
//!
//! Library for migrating Microsoft Access database files to MySQL:
//!
//! - **Table discovery** with system-table filtering
//! - **Type mapping** from Access column types to MySQL
//! - **Table provisioning** with a configurable existing-table policy
//! - **Row-streaming transfer** with batched inserts and per-row failure
//!   isolation
//! - **Progress reporting** and classified failure results
//!
//! ## Example
//!
//! ```rust,no_run
//! use access_mysql_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> access_mysql_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(&config).await?;
//!     let result = orchestrator.run(None).await;
//!     println!("Migrated {} rows", result.rows_migrated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod provision;
pub mod source;
pub mod target;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use crate::config::{
    Config, MigrationConfig, OnExisting, RetryPolicy, SourceConfig, TargetConfig,
};
pub use crate::core::{
    CatalogEntry, Column, Row, RowBatch, SourceStore, SqlValue, Table, TableKind, TargetStore,
};
pub use error::{ErrorCategory, MigrateError, Result};
pub use orchestrator::{
    MigrationResult, Orchestrator, Phase, ProgressEvent, ProgressSink, RunFailure, RunStatus,
    TableResult,
};
pub use provision::{ensure_table, ProvisionOutcome};
pub use source::AccessSource;
pub use target::MysqlTarget;
pub use transfer::{RowFailure, TableTransfer, TransferConfig, TransferEngine};
pub use typemap::NativeType;
