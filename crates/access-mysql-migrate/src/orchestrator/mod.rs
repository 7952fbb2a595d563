//! Migration orchestrator - main workflow coordinator.
//!
//! Runs the state machine Discovering -> Provisioning(table) ->
//! Transferring(table) -> Completed | Failed, strictly sequentially: one
//! catalog query, one DDL/DML statement at a time, never more than one source
//! cursor and one target connection open. The caller may put the whole run on
//! a background task to keep its own loop responsive; the orchestrator itself
//! has no internal parallelism.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::{Config, OnExisting};
use crate::core::schema::Table;
use crate::core::traits::{SourceStore, TargetStore};
use crate::discovery;
use crate::error::{ErrorCategory, MigrateError, Result};
use crate::provision::{self, ProvisionOutcome};
use crate::source::AccessSource;
use crate::target::MysqlTarget;
use crate::transfer::{TransferConfig, TransferEngine};

/// Phase of a migration run, as carried by progress events and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Reading the source catalog and table schemas.
    Discovering,
    /// Creating or clearing a target table.
    Provisioning,
    /// Streaming rows for a table.
    Transferring,
    /// Run finished with every table processed.
    Completed,
    /// Run aborted.
    Failed,
}

/// Progress notification delivered to the caller's sink.
///
/// Emitted once after discovery and once after each table completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current phase.
    pub phase: Phase,

    /// 0-based index of the table just processed.
    pub table_index: usize,

    /// Total number of user tables in this run.
    pub table_count: usize,

    /// Name of the table just processed; `None` for the discovery event.
    pub table_name: Option<String>,

    /// Rows migrated so far across the whole run.
    pub rows_so_far: i64,
}

/// Callback receiving progress events.
pub type ProgressSink = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Terminal failure details, classified for user-facing diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    /// Which side of the transfer failed.
    pub category: ErrorCategory,

    /// Table in progress when the run aborted, if any.
    pub table: Option<String>,

    /// Human-readable cause, underlying store message preserved.
    pub message: String,
}

/// Final status of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All tables processed.
    Completed,
    /// Run aborted by an error.
    Failed,
    /// Run stopped by the cancellation signal.
    Cancelled,
}

/// Per-table outcome included in the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResult {
    /// Table name.
    pub name: String,

    /// Rows written for this table.
    pub rows_migrated: i64,

    /// Rows that failed and were skipped for this table.
    pub rows_failed: i64,
}

/// Result of a migration run.
///
/// Returned for failed runs too, so partial progress is never discarded: the
/// counts cover everything accumulated before the failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Whether the run completed.
    pub success: bool,

    /// Final status.
    pub status: RunStatus,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration finished or aborted.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Tables fully processed (provisioned and transferred, or skipped).
    pub tables_processed: usize,

    /// User tables discovered for this run.
    pub table_count: usize,

    /// Total rows migrated.
    pub rows_migrated: i64,

    /// Total rows that failed row-level transfer.
    pub rows_failed: i64,

    /// Per-table breakdown, in processing order.
    pub table_results: Vec<TableResult>,

    /// Failure details when `success` is false.
    pub failure: Option<RunFailure>,
}

impl MigrationResult {
    /// Convert to a pretty JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MigrateError::Config(format!("result serialization failed: {}", e)))
    }
}

// Mutable run bookkeeping, discarded when the run ends.
struct RunState {
    tables_processed: usize,
    table_count: usize,
    rows_migrated: i64,
    rows_failed: i64,
    table_results: Vec<TableResult>,
    current_table: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            tables_processed: 0,
            table_count: 0,
            rows_migrated: 0,
            rows_failed: 0,
            table_results: Vec::new(),
            current_table: None,
        }
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    on_existing: OnExisting,
    transfer_config: TransferConfig,
    progress: Option<ProgressSink>,
}

impl Orchestrator {
    /// Connect to both stores from configuration and build an orchestrator.
    ///
    /// Connection establishment is retried per the config's retry policy;
    /// all later operations run without retry.
    pub async fn new(config: &Config) -> Result<Self> {
        let retry = config.migration.retry_policy();
        let source = AccessSource::connect(&config.source, retry).await?;
        let target = MysqlTarget::connect(&config.target, retry).await?;

        Ok(Self::from_stores(
            Arc::new(source),
            Arc::new(target),
            config.migration.on_existing,
            TransferConfig {
                batch_size: config.migration.batch_size,
            },
        ))
    }

    /// Build an orchestrator over already-connected stores.
    ///
    /// This is the seam used by tests and by callers with custom store
    /// implementations.
    pub fn from_stores(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        on_existing: OnExisting,
        transfer_config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            on_existing,
            transfer_config,
            progress: None,
        }
    }

    /// Set the progress sink.
    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Discover user tables without touching the target.
    ///
    /// Used by dry runs; a full run re-discovers from scratch.
    pub async fn discover(&self) -> Result<Vec<Table>> {
        discovery::list_user_tables(self.source.as_ref()).await
    }

    /// Run the migration to completion.
    ///
    /// Always returns a result: failures are classified into it together
    /// with the counts accumulated before the failure and the table that was
    /// in progress. Both stores are closed before returning.
    pub async fn run(self, cancel: Option<watch::Receiver<bool>>) -> MigrationResult {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run {}", run_id);

        let mut state = RunState::new();
        let outcome = self.run_inner(&mut state, cancel).await;

        self.source.close().await;
        self.target.close().await;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let (status, failure) = match outcome {
            Ok(()) => (RunStatus::Completed, None),
            Err(MigrateError::Cancelled) => {
                info!("Run {} cancelled after {} tables", run_id, state.tables_processed);
                (
                    RunStatus::Cancelled,
                    Some(RunFailure {
                        category: ErrorCategory::Transfer,
                        table: state.current_table.clone(),
                        message: "migration cancelled".to_string(),
                    }),
                )
            }
            Err(e) => {
                error!("Run {} failed: {}", run_id, e);
                (
                    RunStatus::Failed,
                    Some(RunFailure {
                        category: e.category(),
                        table: state.current_table.clone(),
                        message: e.to_string(),
                    }),
                )
            }
        };

        let result = MigrationResult {
            run_id,
            success: status == RunStatus::Completed,
            status,
            started_at,
            completed_at,
            duration_seconds: duration,
            tables_processed: state.tables_processed,
            table_count: state.table_count,
            rows_migrated: state.rows_migrated,
            rows_failed: state.rows_failed,
            table_results: state.table_results,
            failure,
        };

        info!(
            "Migration {:?}: {}/{} tables, {} rows migrated, {} rows failed in {:.1}s",
            result.status,
            result.tables_processed,
            result.table_count,
            result.rows_migrated,
            result.rows_failed,
            result.duration_seconds
        );

        result
    }

    async fn run_inner(
        &self,
        state: &mut RunState,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<()> {
        let cancelled = || cancel.as_ref().map(|c| *c.borrow()).unwrap_or(false);

        // Phase 1: discovery. An empty source fails the run rather than
        // completing with zero rows.
        let tables = self.discover().await?;
        if tables.is_empty() {
            return Err(MigrateError::NoUserTables);
        }
        state.table_count = tables.len();

        self.emit(ProgressEvent {
            phase: Phase::Discovering,
            table_index: 0,
            table_count: tables.len(),
            table_name: None,
            rows_so_far: 0,
        });

        let engine = TransferEngine::new(
            self.source.clone(),
            self.target.clone(),
            self.transfer_config.clone(),
        );

        // Phase 2+3 per table, in catalog order.
        for (index, table) in tables.iter().enumerate() {
            if cancelled() {
                return Err(MigrateError::Cancelled);
            }
            state.current_table = Some(table.name.clone());

            let provisioned =
                provision::ensure_table(self.target.as_ref(), table, self.on_existing).await?;

            let (rows_migrated, rows_failed) = if provisioned == ProvisionOutcome::Skipped {
                (0, 0)
            } else {
                let transfer = engine.transfer_table(table, cancel.as_ref()).await?;
                (transfer.rows_migrated, transfer.rows_failed)
            };

            state.rows_migrated += rows_migrated;
            state.rows_failed += rows_failed;
            state.tables_processed += 1;
            state.table_results.push(TableResult {
                name: table.name.clone(),
                rows_migrated,
                rows_failed,
            });

            self.emit(ProgressEvent {
                phase: Phase::Transferring,
                table_index: index,
                table_count: tables.len(),
                table_name: Some(table.name.clone()),
                rows_so_far: state.rows_migrated,
            });
        }

        state.current_table = None;
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref sink) = self.progress {
            sink(event);
        }
    }
}
