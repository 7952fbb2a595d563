//! ODBC-based Access source.
//!
//! Reads `.mdb`/`.accdb` files through the Access ODBC driver. ODBC handles
//! are blocking, so metadata calls run behind a mutex on short blocking
//! sections and row streaming runs on a dedicated blocking task that feeds a
//! bounded channel.
//!
//! **Requirements:** an Access ODBC driver must be installed:
//! - Windows: Microsoft Access Database Engine redistributable
//! - Linux/macOS: mdbtools ODBC (set `source.driver: MDBTools` in the config)

use std::sync::Arc;

use async_trait::async_trait;
use odbc_api::{
    buffers::TextRowSet, ConnectionOptions, Cursor, DataType, Environment, Nullability,
    ResultSetMetadata,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, SourceConfig};
use crate::core::identifier::quote_access;
use crate::core::schema::{CatalogEntry, Column, Table, TableKind};
use crate::core::traits::SourceStore;
use crate::core::value::{RowBatch, SqlValue};
use crate::error::{MigrateError, Result};
use crate::typemap::NativeType;

/// Rows per ODBC block fetch when reading the catalog.
const CATALOG_FETCH_ROWS: usize = 256;

/// Maximum bytes per text cell in the fetch buffers.
const MAX_CELL_BYTES: usize = 65536;

/// Access source store backed by ODBC.
pub struct AccessSource {
    env: Arc<Environment>,
    connection_string: String,
    /// Serializes metadata operations (ODBC statement use is not thread-safe).
    conn_mutex: Mutex<()>,
}

impl AccessSource {
    /// Connect to an Access file, retrying connection failures per policy.
    pub async fn connect(config: &SourceConfig, retry: RetryPolicy) -> Result<Self> {
        let env = Environment::new().map_err(|e| {
            MigrateError::SourceConnection(format!(
                "Failed to create ODBC environment: {}. \
                 Make sure an ODBC driver manager is installed.",
                e
            ))
        })?;

        let connection_string = config.connection_string();

        let mut last_err = None;
        let mut connected = false;
        for attempt in 1..=retry.attempts {
            // Probe connection in its own scope so the borrow on `env` ends
            // before `env` moves into the Arc below.
            match env.connect_with_connection_string(
                &connection_string,
                ConnectionOptions::default(),
            ) {
                Ok(conn) => {
                    drop(conn);
                    connected = true;
                    break;
                }
                Err(e) => {
                    warn!(
                        "Source connection attempt {}/{} failed: {}",
                        attempt, retry.attempts, e
                    );
                    last_err = Some(e);
                    if attempt < retry.attempts {
                        tokio::time::sleep(retry.backoff * attempt).await;
                    }
                }
            }
        }

        if !connected {
            return Err(MigrateError::SourceConnection(format!(
                "Failed to open Access file {} after {} attempts: {}. \
                 Check that the file exists, is not corrupt, and that the \
                 Access ODBC driver is installed.",
                config.path.display(),
                retry.attempts,
                last_err.map(|e| e.to_string()).unwrap_or_default()
            )));
        }

        info!("Connected to Access source: {}", config.path.display());
        Ok(Self {
            env: Arc::new(env),
            connection_string,
            conn_mutex: Mutex::new(()),
        })
    }

    fn get_connection(&self) -> Result<odbc_api::Connection<'_>> {
        self.env
            .connect_with_connection_string(&self.connection_string, ConnectionOptions::default())
            .map_err(|e| {
                MigrateError::SourceConnection(format!("ODBC connection failed: {}", e))
            })
    }
}

#[async_trait]
impl SourceStore for AccessSource {
    async fn list_tables(&self) -> Result<Vec<CatalogEntry>> {
        let _lock = self.conn_mutex.lock().await;
        let conn = self.get_connection()?;

        let mut cursor = conn
            .tables("", "", "", "")
            .map_err(|e| MigrateError::SourceSchema(format!("catalog query failed: {}", e)))?;

        // SQLTables result layout: TABLE_CAT, TABLE_SCHEM, TABLE_NAME, TABLE_TYPE
        let mut buffers = TextRowSet::for_cursor(CATALOG_FETCH_ROWS, &mut cursor, Some(4096))
            .map_err(|e| {
                MigrateError::SourceSchema(format!("catalog buffer setup failed: {}", e))
            })?;
        let mut row_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(|e| MigrateError::SourceSchema(format!("catalog bind failed: {}", e)))?;

        let mut entries = Vec::new();
        while let Some(batch) = row_cursor
            .fetch()
            .map_err(|e| MigrateError::SourceSchema(format!("catalog fetch failed: {}", e)))?
        {
            for row_idx in 0..batch.num_rows() {
                let name = batch
                    .at(2, row_idx)
                    .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                    .unwrap_or_default();
                let table_type = batch
                    .at(3, row_idx)
                    .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                    .unwrap_or_default();

                if name.is_empty() {
                    continue;
                }

                let kind = if table_type == "TABLE" {
                    TableKind::User
                } else {
                    TableKind::System
                };
                entries.push(CatalogEntry { name, kind });
            }
        }

        debug!("Catalog returned {} entries", entries.len());
        Ok(entries)
    }

    async fn table_schema(&self, table_name: &str) -> Result<Vec<Column>> {
        let _lock = self.conn_mutex.lock().await;
        let conn = self.get_connection()?;

        // Zero-row probe: metadata only, never materializes data.
        let sql = format!("SELECT * FROM {} WHERE 1=0", quote_access(table_name)?);
        let mut cursor = conn
            .execute(&sql, ())
            .map_err(|e| {
                MigrateError::SourceSchema(format!(
                    "schema query failed for {}: {}",
                    table_name, e
                ))
            })?
            .ok_or_else(|| {
                MigrateError::SourceSchema(format!("schema query returned no result set for {}", table_name))
            })?;

        let num_cols = cursor.num_result_cols().map_err(|e| {
            MigrateError::SourceSchema(format!("column count failed for {}: {}", table_name, e))
        })? as u16;

        let mut columns = Vec::with_capacity(num_cols as usize);
        for col_number in 1..=num_cols {
            let name = cursor.col_name(col_number).map_err(|e| {
                MigrateError::SourceSchema(format!(
                    "column name lookup failed for {}: {}",
                    table_name, e
                ))
            })?;
            let data_type = cursor.col_data_type(col_number).map_err(|e| {
                MigrateError::SourceSchema(format!(
                    "column type lookup failed for {}.{}: {}",
                    table_name, name, e
                ))
            })?;
            let nullability = cursor
                .col_nullability(col_number)
                .unwrap_or(Nullability::Unknown);

            columns.push(Column {
                name,
                native_type: native_type_from_odbc(data_type),
                nullable: !matches!(nullability, Nullability::NoNulls),
                ordinal: (col_number - 1) as usize,
            });
        }

        Ok(columns)
    }

    fn stream_rows(&self, table: &Table, batch_size: usize) -> mpsc::Receiver<Result<RowBatch>> {
        let (tx, rx) = mpsc::channel::<Result<RowBatch>>(4);

        let env = self.env.clone();
        let connection_string = self.connection_string.clone();
        let table_name = table.name.clone();
        let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let native_types: Vec<NativeType> =
            table.columns.iter().map(|c| c.native_type).collect();

        tokio::task::spawn_blocking(move || {
            let result = read_table_blocking(
                &env,
                &connection_string,
                &table_name,
                &column_names,
                &native_types,
                batch_size,
                &tx,
            );
            if let Err(e) = result {
                // Receiver may already be gone; nothing else to do then.
                let _ = tx.blocking_send(Err(e));
            }
        });

        rx
    }

    async fn close(&self) {
        // Connections are per-call; dropping the environment closes ODBC.
        debug!("Access source closed");
    }
}

/// Read every row of a table and push batches into the channel.
///
/// Runs on a blocking thread; `blocking_send` provides the backpressure.
fn read_table_blocking(
    env: &Environment,
    connection_string: &str,
    table_name: &str,
    column_names: &[String],
    native_types: &[NativeType],
    batch_size: usize,
    tx: &mpsc::Sender<Result<RowBatch>>,
) -> Result<()> {
    let conn = env
        .connect_with_connection_string(connection_string, ConnectionOptions::default())
        .map_err(|e| MigrateError::SourceConnection(format!("ODBC connection failed: {}", e)))?;

    // Explicit column list in ordinal order, so row values line up with the
    // descriptor used for parameter binding on the target side.
    let select_list = column_names
        .iter()
        .map(|name| quote_access(name))
        .collect::<Result<Vec<_>>>()?
        .join(", ");
    let sql = format!("SELECT {} FROM {}", select_list, quote_access(table_name)?);

    let mut cursor = conn
        .execute(&sql, ())
        .map_err(|e| {
            MigrateError::SourceSchema(format!("row query failed for {}: {}", table_name, e))
        })?
        .ok_or_else(|| {
            MigrateError::SourceSchema(format!("row query returned no result set for {}", table_name))
        })?;

    let mut buffers = TextRowSet::for_cursor(batch_size.max(1), &mut cursor, Some(MAX_CELL_BYTES))
        .map_err(|e| {
            MigrateError::SourceSchema(format!("row buffer setup failed for {}: {}", table_name, e))
        })?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers).map_err(|e| {
        MigrateError::SourceSchema(format!("row bind failed for {}: {}", table_name, e))
    })?;

    loop {
        let batch = row_cursor.fetch().map_err(|e| {
            MigrateError::SourceSchema(format!("row fetch failed for {}: {}", table_name, e))
        })?;
        let Some(batch) = batch else {
            break;
        };

        let mut rows: RowBatch = Vec::with_capacity(batch.num_rows());
        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(native_types.len());
            for (col_idx, native) in native_types.iter().enumerate() {
                let text = batch
                    .at(col_idx, row_idx)
                    .map(|bytes| String::from_utf8_lossy(bytes).to_string());
                row.push(parse_text_value(text, *native));
            }
            rows.push(row);
        }

        if tx.blocking_send(Ok(rows)).is_err() {
            // Receiver dropped; stop reading.
            break;
        }
    }

    Ok(())
}

/// Resolve an ODBC column type to the semantic native type tag.
fn native_type_from_odbc(data_type: DataType) -> NativeType {
    match data_type {
        DataType::TinyInt | DataType::SmallInt => NativeType::SmallInt,
        DataType::Integer | DataType::BigInt => NativeType::Int,
        DataType::Real | DataType::Float { .. } => NativeType::Float,
        DataType::Double => NativeType::Double,
        DataType::Decimal { .. } | DataType::Numeric { .. } => NativeType::Decimal,
        DataType::Date | DataType::Time { .. } | DataType::Timestamp { .. } => {
            NativeType::DateTime
        }
        DataType::Bit => NativeType::Boolean,
        DataType::Char { .. }
        | DataType::WChar { .. }
        | DataType::Varchar { .. }
        | DataType::WVarchar { .. }
        | DataType::LongVarchar { .. }
        | DataType::WLongVarchar { .. } => NativeType::Text,
        _ => NativeType::Unknown,
    }
}

/// Convert an ODBC text cell to a typed value.
///
/// `None` means SQL NULL. Unparseable numeric/temporal cells degrade to NULL
/// rather than sinking the whole row.
fn parse_text_value(text: Option<String>, native: NativeType) -> SqlValue {
    let Some(s) = text else {
        return SqlValue::Null;
    };

    match native {
        NativeType::Boolean => match s.as_str() {
            // Access/Jet reports TRUE as -1.
            "1" | "-1" | "true" | "True" | "TRUE" => SqlValue::Bool(true),
            "0" | "false" | "False" | "FALSE" => SqlValue::Bool(false),
            _ => SqlValue::Bool(s.parse().unwrap_or(false)),
        },
        NativeType::SmallInt | NativeType::Int => {
            s.parse::<i64>().map(SqlValue::Int).unwrap_or(SqlValue::Null)
        }
        NativeType::Float | NativeType::Double => s
            .parse::<f64>()
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null),
        NativeType::Decimal => {
            // Currency columns may carry symbols and thousands separators.
            let cleaned = s.replace(['$', '€', ','], "");
            rust_decimal::Decimal::from_str_exact(&cleaned)
                .map(SqlValue::Decimal)
                .or_else(|_| cleaned.parse::<f64>().map(SqlValue::Float))
                .unwrap_or(SqlValue::Null)
        }
        NativeType::DateTime => chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S"))
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| {
                chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            })
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null),
        NativeType::Text | NativeType::Unknown => SqlValue::Text(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_null_cell_is_null_for_every_type() {
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
            assert_eq!(parse_text_value(None, native), SqlValue::Null);
        }
    }

    #[test]
    fn test_boolean_access_conventions() {
        assert_eq!(
            parse_text_value(Some("-1".into()), NativeType::Boolean),
            SqlValue::Bool(true)
        );
        assert_eq!(
            parse_text_value(Some("1".into()), NativeType::Boolean),
            SqlValue::Bool(true)
        );
        assert_eq!(
            parse_text_value(Some("0".into()), NativeType::Boolean),
            SqlValue::Bool(false)
        );
    }

    #[test]
    fn test_integer_parsing() {
        assert_eq!(
            parse_text_value(Some("42".into()), NativeType::Int),
            SqlValue::Int(42)
        );
        assert_eq!(
            parse_text_value(Some("-7".into()), NativeType::SmallInt),
            SqlValue::Int(-7)
        );
        assert_eq!(
            parse_text_value(Some("oops".into()), NativeType::Int),
            SqlValue::Null
        );
    }

    #[test]
    fn test_decimal_strips_currency_formatting() {
        assert_eq!(
            parse_text_value(Some("$1,234.50".into()), NativeType::Decimal),
            SqlValue::Decimal(rust_decimal::Decimal::from_str_exact("1234.50").unwrap())
        );
    }

    #[test]
    fn test_datetime_formats() {
        let expected = SqlValue::DateTime(
            NaiveDate::from_ymd_opt(2023, 1, 15)
                .unwrap()
                .and_hms_opt(10, 30, 45)
                .unwrap(),
        );
        assert_eq!(
            parse_text_value(Some("2023-01-15 10:30:45".into()), NativeType::DateTime),
            expected
        );
        assert_eq!(
            parse_text_value(Some("2023-01-15T10:30:45".into()), NativeType::DateTime),
            expected
        );

        let midnight = SqlValue::DateTime(
            NaiveDate::from_ymd_opt(2023, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        assert_eq!(
            parse_text_value(Some("2023-01-15".into()), NativeType::DateTime),
            midnight
        );
    }

    #[test]
    fn test_text_passthrough() {
        assert_eq!(
            parse_text_value(Some("O'Brien".into()), NativeType::Text),
            SqlValue::Text("O'Brien".into())
        );
    }

    #[test]
    fn test_odbc_type_resolution() {
        assert_eq!(
            native_type_from_odbc(DataType::Integer),
            NativeType::Int
        );
        assert_eq!(native_type_from_odbc(DataType::Bit), NativeType::Boolean);
        assert_eq!(native_type_from_odbc(DataType::Double), NativeType::Double);
        assert_eq!(
            native_type_from_odbc(DataType::Unknown),
            NativeType::Unknown
        );
    }
}
