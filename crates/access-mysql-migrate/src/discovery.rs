//! User-table discovery: catalog listing, system-table filtering, and
//! schema-only column loading.

use tracing::{debug, info};

use crate::core::schema::{CatalogEntry, Table, TableKind};
use crate::core::traits::SourceStore;
use crate::error::Result;

/// Name prefixes that mark internal tables in an Access catalog.
///
/// `MSys` covers the Jet system tables, `~` temporary objects, `_` hidden
/// scratch tables. Matching is case-sensitive against the original catalog
/// naming convention.
pub const SYSTEM_TABLE_PREFIXES: [&str; 3] = ["MSys", "~", "_"];

/// Check whether a catalog entry is a migratable user table.
pub fn is_user_table(entry: &CatalogEntry) -> bool {
    entry.kind == TableKind::User
        && !SYSTEM_TABLE_PREFIXES
            .iter()
            .any(|prefix| entry.name.starts_with(prefix))
}

/// List all user tables from the source, with their column schemas.
///
/// Tables come back in catalog order, not re-sorted. An empty result is not
/// an error here; the orchestrator decides whether an empty source is fatal.
/// Column metadata is loaded with one schema-only query per table, so this
/// is O(tables x columns) regardless of row counts.
pub async fn list_user_tables(source: &dyn SourceStore) -> Result<Vec<Table>> {
    let entries = source.list_tables().await?;
    let total = entries.len();

    let mut tables = Vec::new();
    for entry in entries.into_iter().filter(is_user_table) {
        let columns = source.table_schema(&entry.name).await?;
        debug!(
            "Discovered table {} with {} columns",
            entry.name,
            columns.len()
        );
        tables.push(Table::new(entry.name, columns)?);
    }

    info!(
        "Discovered {} user tables ({} catalog entries filtered out)",
        tables.len(),
        total - tables.len()
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: TableKind) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn test_user_table_accepted() {
        assert!(is_user_table(&entry("Customer", TableKind::User)));
        assert!(is_user_table(&entry("Orders2024", TableKind::User)));
    }

    #[test]
    fn test_system_kind_rejected() {
        assert!(!is_user_table(&entry("Customer", TableKind::System)));
    }

    #[test]
    fn test_internal_prefixes_rejected() {
        assert!(!is_user_table(&entry("MSysObjects", TableKind::User)));
        assert!(!is_user_table(&entry("~TMPCLP12345", TableKind::User)));
        assert!(!is_user_table(&entry("_staging", TableKind::User)));
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        // "msys" does not match the Jet convention "MSys"
        assert!(is_user_table(&entry("msysteem", TableKind::User)));
    }

    #[test]
    fn test_prefix_must_be_at_start() {
        assert!(is_user_table(&entry("CustomerMSys", TableKind::User)));
    }
}
