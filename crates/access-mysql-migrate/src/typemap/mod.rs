//! Type mapping between Access column types and MySQL.
//!
//! The mapping is deliberately a tagged enum plus a pure, total function:
//! every native type resolves to exactly one MySQL type, unknown types fall
//! open to TEXT, and nothing in here can fail or touch a connection.

use serde::{Deserialize, Serialize};

use crate::core::schema::Column;

/// Semantic tag for a source column's native type.
///
/// Derived from the ODBC result-set metadata of the Access file, decoupled
/// from any particular driver's type representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeType {
    /// 16-bit integer (Access Integer).
    SmallInt,
    /// 32-bit integer (Access Long Integer, AutoNumber).
    Int,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Fixed-point decimal (Access Decimal, Currency).
    Decimal,
    /// Date/time (Access Date/Time).
    DateTime,
    /// Boolean (Access Yes/No).
    Boolean,
    /// Character data of any length.
    Text,
    /// Anything the source reports that we do not recognize.
    Unknown,
}

/// Map a native source type to its MySQL column type.
///
/// Total and deterministic; unrecognized types become TEXT rather than
/// rejecting the column.
pub fn mysql_type(native: NativeType) -> &'static str {
    match native {
        NativeType::SmallInt | NativeType::Int => "INT",
        NativeType::Float | NativeType::Double | NativeType::Decimal => "DECIMAL(10,2)",
        NativeType::DateTime => "DATETIME",
        NativeType::Boolean => "BOOLEAN",
        NativeType::Text | NativeType::Unknown => "TEXT",
    }
}

/// A source column resolved to its target shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetColumn {
    /// Column name (same as source).
    pub name: String,

    /// MySQL column type.
    pub sql_type: &'static str,

    /// Whether this column becomes the table's primary key.
    pub is_primary_key: bool,
}

/// Check whether a column name selects the primary key.
///
/// Key detection is by name only: a column is the primary key iff it is
/// named `id`, case-insensitively. Source-side key metadata is not consulted.
pub fn is_primary_key_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("id")
}

/// Resolve all columns of a table to their target shapes, in source order.
///
/// At most one column is marked primary key; if several names match the rule
/// (possible only with case-variant duplicates), the first in ordinal order
/// wins.
pub fn map_columns(columns: &[Column]) -> Vec<TargetColumn> {
    let mut pk_assigned = false;
    columns
        .iter()
        .map(|col| {
            let is_pk = !pk_assigned && is_primary_key_name(&col.name);
            pk_assigned |= is_pk;
            TargetColumn {
                name: col.name.clone(),
                sql_type: mysql_type(col.native_type),
                is_primary_key: is_pk,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, native: NativeType) -> Column {
        Column {
            name: name.to_string(),
            native_type: native,
            nullable: true,
            ordinal: 0,
        }
    }

    #[test]
    fn test_integer_types() {
        assert_eq!(mysql_type(NativeType::SmallInt), "INT");
        assert_eq!(mysql_type(NativeType::Int), "INT");
    }

    #[test]
    fn test_numeric_types() {
        assert_eq!(mysql_type(NativeType::Float), "DECIMAL(10,2)");
        assert_eq!(mysql_type(NativeType::Double), "DECIMAL(10,2)");
        assert_eq!(mysql_type(NativeType::Decimal), "DECIMAL(10,2)");
    }

    #[test]
    fn test_temporal_and_boolean() {
        assert_eq!(mysql_type(NativeType::DateTime), "DATETIME");
        assert_eq!(mysql_type(NativeType::Boolean), "BOOLEAN");
    }

    #[test]
    fn test_text_and_unknown_fall_open() {
        assert_eq!(mysql_type(NativeType::Text), "TEXT");
        assert_eq!(mysql_type(NativeType::Unknown), "TEXT");
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for native in [
            NativeType::SmallInt,
            NativeType::Int,
            NativeType::Float,
            NativeType::Double,
            NativeType::Decimal,
            NativeType::DateTime,
            NativeType::Boolean,
            NativeType::Text,
            NativeType::Unknown,
        ] {
            assert_eq!(mysql_type(native), mysql_type(native));
        }
    }

    #[test]
    fn test_primary_key_name_case_insensitive() {
        assert!(is_primary_key_name("id"));
        assert!(is_primary_key_name("ID"));
        assert!(is_primary_key_name("Id"));
        assert!(!is_primary_key_name("customer_id"));
        assert!(!is_primary_key_name("ids"));
    }

    #[test]
    fn test_map_columns_marks_id_as_pk() {
        let cols = vec![col("Id", NativeType::Int), col("name", NativeType::Text)];
        let mapped = map_columns(&cols);
        assert!(mapped[0].is_primary_key);
        assert!(!mapped[1].is_primary_key);
        assert_eq!(mapped[0].sql_type, "INT");
        assert_eq!(mapped[1].sql_type, "TEXT");
    }

    #[test]
    fn test_map_columns_at_most_one_pk() {
        let cols = vec![col("ID", NativeType::Int), col("id", NativeType::Int)];
        let mapped = map_columns(&cols);
        let pk_count = mapped.iter().filter(|c| c.is_primary_key).count();
        assert_eq!(pk_count, 1);
        assert!(mapped[0].is_primary_key, "first match wins");
    }

    #[test]
    fn test_map_columns_preserves_order() {
        let cols = vec![
            col("b", NativeType::Text),
            col("a", NativeType::Int),
            col("c", NativeType::Boolean),
        ];
        let names: Vec<_> = map_columns(&cols).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
