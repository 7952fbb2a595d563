//! Schema metadata types for source tables and columns.
//!
//! These types are a database-agnostic snapshot of what discovery found:
//! produced fresh per migration run, immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::typemap::NativeType;

/// Classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// A table created by end users.
    User,
    /// Internal, system, or hidden table.
    System,
}

/// A raw table listing from the source catalog, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Table name as reported by the catalog.
    pub name: String,

    /// Whether the catalog reports this as a user table.
    pub kind: TableKind,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Native type tag resolved from source metadata.
    pub native_type: NativeType,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Ordinal position, 0-based, matching source column order.
    pub ordinal: usize,
}

/// Table metadata: name plus ordered column descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, unique within the source.
    pub name: String,

    /// Columns in source order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table descriptor, validating the column-order invariant.
    ///
    /// Ordinals must be contiguous from 0 and match the slice order exactly;
    /// the transfer engine binds insert parameters by position, so a gap or
    /// permutation here would silently misalign values.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        for (idx, col) in columns.iter().enumerate() {
            if col.ordinal != idx {
                return Err(MigrateError::SourceSchema(format!(
                    "table {}: column {} has ordinal {} but position {}",
                    name, col.name, col.ordinal, idx
                )));
            }
        }
        Ok(Self { name, columns })
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, ordinal: usize) -> Column {
        Column {
            name: name.to_string(),
            native_type: NativeType::Text,
            nullable: true,
            ordinal,
        }
    }

    #[test]
    fn test_table_new_accepts_contiguous_ordinals() {
        let table = Table::new("Customer", vec![column("id", 0), column("name", 1)]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_table_new_rejects_ordinal_gap() {
        let err = Table::new("Customer", vec![column("id", 0), column("name", 2)]).unwrap_err();
        assert!(matches!(err, MigrateError::SourceSchema(_)));
    }

    #[test]
    fn test_table_new_rejects_permuted_ordinals() {
        let err = Table::new("Customer", vec![column("name", 1), column("id", 0)]).unwrap_err();
        assert!(matches!(err, MigrateError::SourceSchema(_)));
    }

    #[test]
    fn test_empty_table_is_valid() {
        let table = Table::new("Empty", vec![]).unwrap();
        assert!(table.columns.is_empty());
    }
}
