//! Centralized identifier validation and quoting.
//!
//! SQL identifiers (table names, column names) cannot be passed as prepared
//! statement parameters, so dynamic DDL/DML must quote them. Quoting also
//! tolerates reserved words and embedded whitespace, both of which are common
//! in Access databases.

use crate::error::{MigrateError, Result};

/// Maximum identifier length accepted from either store.
/// - Access/Jet: 64 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate an identifier before quoting.
///
/// Rejects empty names, names containing null bytes, and names exceeding the
/// maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote an Access SQL identifier using brackets.
///
/// Escapes closing brackets by doubling them and wraps in brackets.
pub fn quote_access(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("Customer").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        assert!(validate_identifier("table\0name").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name).is_err());
    }

    #[test]
    fn test_validate_identifier_accepts_max_length() {
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());
    }

    #[test]
    fn test_quote_mysql_normal() {
        assert_eq!(quote_mysql("Customer").unwrap(), "`Customer`");
    }

    #[test]
    fn test_quote_mysql_escapes_backtick() {
        assert_eq!(quote_mysql("table`name").unwrap(), "`table``name`");
    }

    #[test]
    fn test_quote_mysql_injection_safely_quoted() {
        let result = quote_mysql("Robert`); DROP TABLE Students;--").unwrap();
        assert_eq!(result, "`Robert``); DROP TABLE Students;--`");
    }

    #[test]
    fn test_quote_access_normal() {
        assert_eq!(quote_access("Customer").unwrap(), "[Customer]");
    }

    #[test]
    fn test_quote_access_escapes_bracket() {
        assert_eq!(quote_access("table]name").unwrap(), "[table]]name]");
    }

    #[test]
    fn test_quote_access_rejects_null_byte() {
        assert!(quote_access("table\0name").is_err());
    }
}
