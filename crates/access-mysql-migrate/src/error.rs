//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, bad file path, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to connect to the Access source file.
    #[error("Source connection error: {0}")]
    SourceConnection(String),

    /// Failed to read catalog or column metadata from the source.
    #[error("Source schema error: {0}")]
    SourceSchema(String),

    /// Failed to connect to the MySQL target server.
    #[error("Target connection error: {0}")]
    TargetConnection(String),

    /// DDL or catalog operation failed on the target.
    #[error("Target schema error for table {table}: {message}")]
    TargetSchema { table: String, message: String },

    /// Data transfer failed for a specific table.
    ///
    /// This is the table-level failure that aborts a run; individual row
    /// failures are counted by the transfer engine, not raised.
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// Discovery found no user tables in the source.
    #[error("No user tables found in the source database")]
    NoUserTables,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

/// Coarse failure classification surfaced to the caller for diagnosis.
///
/// Three categories only, per the user-facing contract: was the problem on
/// the source side, the target side, or in the transfer itself?
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Source store error (connection, catalog, schema, empty database).
    Source,
    /// Target store error (connection, DDL, catalog).
    Target,
    /// Transfer error (everything else that aborts a run).
    Transfer,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Source => write!(f, "source store error"),
            ErrorCategory::Target => write!(f, "target store error"),
            ErrorCategory::Transfer => write!(f, "transfer error"),
        }
    }
}

impl MigrateError {
    /// Create a Transfer error.
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a TargetSchema error.
    pub fn target_schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::TargetSchema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Classify this error into one of the three user-facing categories.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrateError::SourceConnection(_)
            | MigrateError::SourceSchema(_)
            | MigrateError::NoUserTables => ErrorCategory::Source,
            MigrateError::TargetConnection(_) | MigrateError::TargetSchema { .. } => {
                ErrorCategory::Target
            }
            _ => ErrorCategory::Transfer,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 2,
            MigrateError::SourceConnection(_)
            | MigrateError::SourceSchema(_)
            | MigrateError::NoUserTables => 3,
            MigrateError::TargetConnection(_) | MigrateError::TargetSchema { .. } => 4,
            MigrateError::Transfer { .. } => 5,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_source() {
        assert_eq!(
            MigrateError::SourceConnection("down".into()).category(),
            ErrorCategory::Source
        );
        assert_eq!(
            MigrateError::SourceSchema("bad catalog".into()).category(),
            ErrorCategory::Source
        );
        assert_eq!(MigrateError::NoUserTables.category(), ErrorCategory::Source);
    }

    #[test]
    fn test_category_target() {
        assert_eq!(
            MigrateError::TargetConnection("refused".into()).category(),
            ErrorCategory::Target
        );
        assert_eq!(
            MigrateError::target_schema("Customer", "DDL failed").category(),
            ErrorCategory::Target
        );
    }

    #[test]
    fn test_category_transfer() {
        assert_eq!(
            MigrateError::transfer("Customer", "cursor died").category(),
            ErrorCategory::Transfer
        );
        assert_eq!(MigrateError::Cancelled.category(), ErrorCategory::Transfer);
    }

    #[test]
    fn test_exit_codes_distinct_per_category() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 2);
        assert_eq!(MigrateError::NoUserTables.exit_code(), 3);
        assert_eq!(MigrateError::TargetConnection("x".into()).exit_code(), 4);
        assert_eq!(MigrateError::transfer("t", "m").exit_code(), 5);
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = MigrateError::target_schema("Orders", "syntax error near ')'");
        let detailed = err.format_detailed();
        assert!(detailed.contains("Orders"));
        assert!(detailed.contains("syntax error"));
    }
}
