//! SQL value type for database-agnostic row transfer.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// A single cell value read from the source, ready for positional binding.
///
/// Values are owned: the ODBC reader converts out of its fetch buffers before
/// handing rows across the streaming channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value (covers the SmallInt and Int native types).
    Int(i64),

    /// Floating-point value.
    Float(f64),

    /// Fixed-point decimal value.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Text value.
    Text(String),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// A row of cell values in column-ordinal order.
pub type Row = Vec<SqlValue>;

/// A batch of rows moved through the streaming channel.
pub type RowBatch = Vec<Row>;
