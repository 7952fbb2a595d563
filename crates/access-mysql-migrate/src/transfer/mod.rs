//! Row transfer engine: streams one table's rows from source to target.
//!
//! Rows move in batches. Each batch is written as a single multi-row INSERT;
//! if that statement fails, the engine re-drives the same rows one by one so
//! a single bad row cannot sink its neighbors. Batch INSERTs are atomic on
//! the target, so the fallback never duplicates rows.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::schema::Table;
use crate::core::traits::{SourceStore, TargetStore};
use crate::error::{MigrateError, Result};

/// Upper bound on individually recorded row failures per table.
///
/// Counts are always exact; only the per-row reason log is capped.
const MAX_RECORDED_FAILURES: usize = 100;

/// A single row that failed to transfer.
#[derive(Debug, Clone)]
pub struct RowFailure {
    /// 0-based position of the row in the source cursor.
    pub row_index: i64,

    /// Underlying store error message.
    pub reason: String,
}

/// Outcome of transferring one table.
///
/// Partial success is a first-class outcome: `rows_migrated + rows_failed`
/// always equals the number of rows attempted.
#[derive(Debug, Default)]
pub struct TableTransfer {
    /// Rows successfully written to the target.
    pub rows_migrated: i64,

    /// Rows that failed and were skipped.
    pub rows_failed: i64,

    /// Reasons for the first [`MAX_RECORDED_FAILURES`] failed rows.
    pub failures: Vec<RowFailure>,
}

impl TableTransfer {
    fn record_failure(&mut self, row_index: i64, reason: String) {
        self.rows_failed += 1;
        if self.failures.len() < MAX_RECORDED_FAILURES {
            self.failures.push(RowFailure { row_index, reason });
        } else if self.rows_failed == MAX_RECORDED_FAILURES as i64 + 1 {
            warn!(
                "More than {} row failures; further reasons are counted but not recorded",
                MAX_RECORDED_FAILURES
            );
        }
    }
}

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Rows per read batch and per multi-row INSERT.
    pub batch_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

/// Transfer engine for moving data between the two stores.
pub struct TransferEngine {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    config: TransferConfig,
    /// Optional shared counter for real-time progress reporting.
    progress_counter: Option<Arc<AtomicI64>>,
}

impl TransferEngine {
    /// Create a new transfer engine.
    pub fn new(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
            progress_counter: None,
        }
    }

    /// Set a shared counter incremented as rows are migrated.
    pub fn with_progress_counter(mut self, counter: Arc<AtomicI64>) -> Self {
        self.progress_counter = Some(counter);
        self
    }

    /// Transfer all rows of one table.
    ///
    /// Row-level failures are counted and the scan continues; errors from the
    /// source cursor abort the table (and hence the run). Cancellation is
    /// checked between batches.
    pub async fn transfer_table(
        &self,
        table: &Table,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<TableTransfer> {
        debug!(
            "Starting transfer for {} (batch size {})",
            table.name, self.config.batch_size
        );

        let mut rx = self.source.stream_rows(table, self.config.batch_size);
        let mut outcome = TableTransfer::default();
        let mut next_row_index: i64 = 0;

        while let Some(batch) = rx.recv().await {
            if cancel.map(|c| *c.borrow()).unwrap_or(false) {
                return Err(MigrateError::Cancelled);
            }

            // Source cursor errors keep their own classification; they abort
            // the table and the run.
            let rows = batch?;
            if rows.is_empty() {
                continue;
            }

            let migrated_before = outcome.rows_migrated;
            match self.target.insert_rows(table, &rows).await {
                Ok(written) => {
                    outcome.rows_migrated += written as i64;
                }
                Err(batch_err) => {
                    // The batch statement wrote nothing; isolate the bad rows
                    // by re-driving the batch one row at a time.
                    debug!(
                        "{}: batch insert failed ({}), retrying rows individually",
                        table.name, batch_err
                    );
                    for (offset, row) in rows.iter().enumerate() {
                        match self.target.insert_row(table, row).await {
                            Ok(()) => outcome.rows_migrated += 1,
                            Err(row_err) => {
                                outcome.record_failure(
                                    next_row_index + offset as i64,
                                    row_err.to_string(),
                                );
                            }
                        }
                    }
                }
            }

            next_row_index += rows.len() as i64;
            if let Some(ref counter) = self.progress_counter {
                counter.fetch_add(outcome.rows_migrated - migrated_before, Ordering::Relaxed);
            }
        }

        if outcome.rows_failed > 0 {
            warn!(
                "{}: {} rows migrated, {} rows failed",
                table.name, outcome.rows_migrated, outcome.rows_failed
            );
        } else {
            info!("{}: {} rows migrated", table.name, outcome.rows_migrated);
        }

        Ok(outcome)
    }
}
