//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (Access file).
    pub source: SourceConfig,

    /// Target database configuration (MySQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (Access file via ODBC) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the `.mdb` or `.accdb` file.
    pub path: PathBuf,

    /// ODBC driver name.
    #[serde(default = "default_access_driver")]
    pub driver: String,
}

impl SourceConfig {
    /// Build an ODBC connection string for the Access file.
    pub fn connection_string(&self) -> String {
        format!(
            "Driver={{{}}};Dbq={};",
            self.driver,
            self.path.display()
        )
    }
}

/// Target database (MySQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name. Also the schema tables are created in.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SSL mode: disable, prefer, require, verify-ca, verify-full.
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

// Manual Debug so the password never reaches logs.
impl std::fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// What to do when a target table already exists.
///
/// The historical behavior is `Truncate`: delete every existing row before
/// transfer. That is destructive, so it is a configuration choice here, not
/// a hardcoded default buried in the provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExisting {
    /// Delete all existing rows, then transfer (destructive default).
    #[default]
    Truncate,

    /// Leave the table untouched and skip its transfer entirely.
    Skip,

    /// Abort the run.
    Fail,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Policy for target tables that already exist.
    #[serde(default)]
    pub on_existing: OnExisting,

    /// Rows per read batch and per multi-row INSERT.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Connection attempts before giving up (connection errors only).
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Backoff between connection attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            on_existing: OnExisting::default(),
            batch_size: default_batch_size(),
            connect_retries: default_connect_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl MigrationConfig {
    /// Retry policy for connection establishment.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_retries.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Bounded retry with backoff, applied to connection establishment only.
///
/// Schema and constraint errors are permanent and must not be retried; this
/// policy is therefore consumed exclusively by the driver constructors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts (at least 1).
    pub attempts: u32,

    /// Base delay between attempts; attempt n waits n times this.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_connect_retries(),
            backoff: Duration::from_millis(default_retry_backoff_ms()),
        }
    }
}

// Default value functions for serde

fn default_access_driver() -> String {
    "Microsoft Access Driver (*.mdb, *.accdb)".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_ssl_mode() -> String {
    "prefer".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_connect_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}
