//! Target-table provisioning: ensure each table exists with a compatible
//! schema before its transfer starts.

use tracing::{debug, warn};

use crate::config::OnExisting;
use crate::core::schema::Table;
use crate::core::traits::TargetStore;
use crate::error::{MigrateError, Result};

/// What `ensure_table` did to the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Table did not exist and was created.
    Created,

    /// Table existed and all its rows were deleted.
    Truncated,

    /// Table existed and was left untouched; its transfer must be skipped,
    /// otherwise the run would append to the existing rows.
    Skipped,
}

/// Ensure the target table exists and is ready to receive rows.
///
/// Existence is checked with a catalog lookup, never a failing CREATE. When
/// the table already exists the `on_existing` policy decides: `Truncate`
/// deletes every row (destructive), `Skip` leaves the table alone, `Fail`
/// aborts the run.
///
/// DDL and the truncate are separate statements with no transaction around
/// them; MySQL DDL commits implicitly, so a crash between the two leaves the
/// target observable in an intermediate state.
pub async fn ensure_table(
    target: &dyn TargetStore,
    table: &Table,
    on_existing: OnExisting,
) -> Result<ProvisionOutcome> {
    if target.table_exists(&table.name).await? {
        match on_existing {
            OnExisting::Truncate => {
                warn!(
                    "Table {} already exists; deleting all existing rows",
                    table.name
                );
                target.truncate_table(&table.name).await?;
                Ok(ProvisionOutcome::Truncated)
            }
            OnExisting::Skip => {
                debug!("Table {} already exists; skipping", table.name);
                Ok(ProvisionOutcome::Skipped)
            }
            OnExisting::Fail => Err(MigrateError::target_schema(
                &table.name,
                "table already exists and on_existing is set to fail",
            )),
        }
    } else {
        debug!("Creating table {}", table.name);
        target.create_table(table).await?;
        Ok(ProvisionOutcome::Created)
    }
}
