//! MySQL target writer.
//!
//! Uses mysql_async for connection pooling and batched INSERT statements.
//! Tables are created from the type-mapped descriptors with the `id`
//! primary-key rule applied; all data travels as positionally bound
//! parameters.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, SslOpts, TxOpts, Value};
use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, TargetConfig};
use crate::core::identifier::quote_mysql;
use crate::core::schema::Table;
use crate::core::traits::TargetStore;
use crate::core::value::{Row, SqlValue};
use crate::error::{MigrateError, Result};
use crate::typemap::{map_columns, TargetColumn};

/// MySQL caps a statement at 65535 placeholders; larger batches are split
/// inside a transaction so the whole insert stays all-or-nothing.
const MYSQL_MAX_PLACEHOLDERS: usize = 65535;

/// MySQL target store backed by mysql_async.
pub struct MysqlTarget {
    pool: Pool,
    database: String,
}

impl MysqlTarget {
    /// Connect to the MySQL server, retrying connection failures per policy.
    pub async fn connect(config: &TargetConfig, retry: RetryPolicy) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => {
                Some(SslOpts::default())
            }
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            // utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let pool_opts =
            PoolOpts::new().with_constraints(PoolConstraints::new(1, 4).unwrap());
        let opts: Opts = builder.pool_opts(pool_opts).into();
        let pool = Pool::new(opts);

        let mut last_err = None;
        for attempt in 1..=retry.attempts {
            match pool.get_conn().await {
                Ok(mut conn) => match conn.query_drop("SELECT 1").await {
                    Ok(()) => {
                        info!(
                            "Connected to MySQL target: {}:{}/{}",
                            config.host, config.port, config.database
                        );
                        return Ok(Self {
                            pool,
                            database: config.database.clone(),
                        });
                    }
                    Err(e) => last_err = Some(e),
                },
                Err(e) => last_err = Some(e),
            }
            if attempt < retry.attempts {
                warn!(
                    "Target connection attempt {}/{} failed: {}",
                    attempt,
                    retry.attempts,
                    last_err
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default()
                );
                tokio::time::sleep(retry.backoff * attempt).await;
            }
        }

        Err(MigrateError::TargetConnection(format!(
            "Failed to connect to MySQL at {}:{} after {} attempts: {}",
            config.host,
            config.port,
            retry.attempts,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Qualify a table name with the target database.
    fn qualify_table(&self, table: &str) -> Result<String> {
        Ok(format!(
            "{}.{}",
            quote_mysql(&self.database)?,
            quote_mysql(table)?
        ))
    }

    /// Generate CREATE TABLE DDL from the type-mapped descriptor.
    fn generate_ddl(&self, table: &Table) -> Result<String> {
        let mapped = map_columns(&table.columns);

        let mut col_defs = Vec::with_capacity(mapped.len());
        for col in &mapped {
            col_defs.push(self.column_def(table, col)?);
        }

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
            self.qualify_table(&table.name)?,
            col_defs.join(",\n    ")
        ))
    }

    fn column_def(&self, table: &Table, col: &TargetColumn) -> Result<String> {
        let source_col = table
            .columns
            .iter()
            .find(|c| c.name == col.name);
        let null_clause = match source_col {
            Some(c) if !c.nullable => " NOT NULL",
            _ => "",
        };

        // AUTO_INCREMENT is only valid on integer columns; a non-integer
        // column named "id" keeps its plain definition.
        let pk_clause = if col.is_primary_key {
            if col.sql_type == "INT" {
                " PRIMARY KEY AUTO_INCREMENT"
            } else {
                warn!(
                    "Column {}.{} matches the primary-key rule but maps to {}; \
                     no primary key created",
                    table.name, col.name, col.sql_type
                );
                ""
            }
        } else {
            ""
        };

        Ok(format!(
            "{} {}{}{}",
            quote_mysql(&col.name)?,
            col.sql_type,
            null_clause,
            pk_clause
        ))
    }

    /// Build a multi-row INSERT statement with positional placeholders.
    fn build_insert_sql(&self, table: &Table, row_count: usize) -> Result<String> {
        let col_list = table
            .columns
            .iter()
            .map(|c| quote_mysql(&c.name))
            .collect::<Result<Vec<_>>>()?
            .join(", ");

        let placeholders_per_row = format!("({})", vec!["?"; table.columns.len()].join(", "));
        let all_placeholders = vec![placeholders_per_row; row_count].join(", ");

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.qualify_table(&table.name)?,
            col_list,
            all_placeholders
        ))
    }
}

#[async_trait]
impl TargetStore for MysqlTarget {
    async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::TargetConnection(e.to_string()))?;

        let sql = r#"
            SELECT COUNT(*) as cnt FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        "#;

        let count: Option<i64> = conn
            .exec_first(sql, (self.database.as_str(), table_name))
            .await
            .map_err(|e| {
                MigrateError::target_schema(table_name, format!("existence check failed: {}", e))
            })?;

        Ok(count.unwrap_or(0) > 0)
    }

    async fn create_table(&self, table: &Table) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::TargetConnection(e.to_string()))?;

        let ddl = self.generate_ddl(table)?;
        conn.query_drop(&ddl)
            .await
            .map_err(|e| MigrateError::target_schema(&table.name, format!("CREATE TABLE failed: {}", e)))?;

        debug!("Created table {}.{}", self.database, table.name);
        Ok(())
    }

    async fn truncate_table(&self, table_name: &str) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::TargetConnection(e.to_string()))?;

        // DELETE rather than TRUNCATE: works under foreign-key checks and
        // keeps the statement a plain DML row wipe.
        let sql = format!("DELETE FROM {}", self.qualify_table(table_name)?);
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::target_schema(table_name, format!("row wipe failed: {}", e)))?;

        debug!("Cleared all rows from {}.{}", self.database, table_name);
        Ok(())
    }

    async fn insert_rows(&self, table: &Table, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let num_cols = table.columns.len();
        if num_cols == 0 {
            return Ok(0);
        }
        let max_rows_per_stmt = (MYSQL_MAX_PLACEHOLDERS / num_cols).max(1);

        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::TargetConnection(e.to_string()))?;

        // One transaction around all statements keeps the batch atomic even
        // when the placeholder cap forces a split, so the caller can safely
        // re-drive the same rows one by one after a failure.
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(|e| MigrateError::transfer(&table.name, e.to_string()))?;

        for chunk in rows.chunks(max_rows_per_stmt) {
            let sql = self.build_insert_sql(table, chunk.len())?;
            let params: Vec<Value> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_mysql))
                .collect();

            tx.exec_drop(&sql, params)
                .await
                .map_err(|e| MigrateError::transfer(&table.name, format!("INSERT batch: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| MigrateError::transfer(&table.name, e.to_string()))?;

        debug!(
            "MySQL: wrote {} rows to {}.{}",
            rows.len(),
            self.database,
            table.name
        );
        Ok(rows.len() as u64)
    }

    async fn insert_row(&self, table: &Table, row: &Row) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::TargetConnection(e.to_string()))?;

        let sql = self.build_insert_sql(table, 1)?;
        let params: Vec<Value> = row.iter().map(sql_value_to_mysql).collect();

        conn.exec_drop(&sql, params)
            .await
            .map_err(|e| MigrateError::transfer(&table.name, format!("INSERT row: {}", e)))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

/// Convert a SqlValue to a mysql_async parameter value.
fn sql_value_to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::from(*b),
        SqlValue::Int(i) => Value::from(*i),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Decimal(d) => Value::from(d.to_string()),
        SqlValue::DateTime(dt) => Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            (dt.nanosecond() / 1000) as u32,
        ),
        SqlValue::Text(s) => Value::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Column;
    use crate::typemap::NativeType;

    fn target() -> MysqlTarget {
        MysqlTarget {
            pool: Pool::new(
                OptsBuilder::default()
                    .ip_or_hostname("localhost")
                    .db_name(Some("testdb")),
            ),
            database: "testdb".to_string(),
        }
    }

    fn column(name: &str, native: NativeType, nullable: bool, ordinal: usize) -> Column {
        Column {
            name: name.to_string(),
            native_type: native,
            nullable,
            ordinal,
        }
    }

    fn customer_table() -> Table {
        Table::new(
            "Customer",
            vec![
                column("id", NativeType::Int, false, 0),
                column("name", NativeType::Text, true, 1),
                column("signup", NativeType::DateTime, true, 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_generate_ddl_shape() {
        let ddl = target().generate_ddl(&customer_table()).unwrap();
        assert!(ddl.starts_with("CREATE TABLE `testdb`.`Customer`"));
        assert!(ddl.contains("`id` INT NOT NULL PRIMARY KEY AUTO_INCREMENT"));
        assert!(ddl.contains("`name` TEXT"));
        assert!(ddl.contains("`signup` DATETIME"));
        assert!(ddl.contains("ENGINE=InnoDB"));
    }

    #[test]
    fn test_generate_ddl_no_pk_without_id() {
        let table = Table::new(
            "Log",
            vec![
                column("entry", NativeType::Text, true, 0),
                column("at", NativeType::DateTime, true, 1),
            ],
        )
        .unwrap();
        let ddl = target().generate_ddl(&table).unwrap();
        assert!(!ddl.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_generate_ddl_non_integer_id_gets_no_autoincrement() {
        let table = Table::new(
            "Weird",
            vec![column("id", NativeType::Text, true, 0)],
        )
        .unwrap();
        let ddl = target().generate_ddl(&table).unwrap();
        assert!(!ddl.contains("AUTO_INCREMENT"));
        assert!(ddl.contains("`id` TEXT"));
    }

    #[test]
    fn test_build_insert_sql_positional_placeholders() {
        let sql = target().build_insert_sql(&customer_table(), 2).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `testdb`.`Customer` (`id`, `name`, `signup`) \
             VALUES (?, ?, ?), (?, ?, ?)"
        );
    }

    #[test]
    fn test_sql_value_conversion() {
        assert_eq!(sql_value_to_mysql(&SqlValue::Null), Value::NULL);
        assert_eq!(sql_value_to_mysql(&SqlValue::Int(5)), Value::from(5i64));
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Text("x".into())),
            Value::from("x")
        );
        let dt = chrono::NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(
            sql_value_to_mysql(&SqlValue::DateTime(dt)),
            Value::Date(2023, 6, 1, 12, 30, 0, 0)
        );
    }

    #[test]
    fn test_decimal_binds_as_string() {
        let d = rust_decimal::Decimal::from_str_exact("10.25").unwrap();
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Decimal(d)),
            Value::from("10.25")
        );
    }
}
