//! Validated SQL table identifiers.
//!
//! Table names arrive from the environment and end up interpolated into SQL
//! text, so they pass through exactly one gate: [`TableIdentifier::new`].
//! Only names matching `^[A-Za-z0-9_]+$` are accepted; anything else is a
//! configuration error naming the variable it came from.

use std::fmt;

use crate::error::{MigrateError, Result};

/// A table name proven safe for SQL interpolation.
///
/// Immutable once constructed, once per run; the raw string is reachable
/// only through [`as_str`](Self::as_str) and the dialect quoting helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier(String);

impl TableIdentifier {
    /// Validate `value` (ASCII letters, digits and underscores, nothing
    /// else, non-empty) and wrap it. `param` names the configuration
    /// variable the value came from, so a rejection points straight back at
    /// the operator's input.
    pub fn new(value: &str, param: &str) -> Result<Self> {
        let valid =
            !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if !valid {
            return Err(MigrateError::config(format!(
                "Invalid {}: '{}' (table names may contain only ASCII letters, digits and underscores)",
                param, value
            )));
        }
        Ok(TableIdentifier(value.to_string()))
    }

    /// The validated name, unchanged from what the operator supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for MySQL statements.
    ///
    /// The validated charset cannot contain backticks, so plain wrapping is
    /// sufficient.
    pub fn quoted_mysql(&self) -> String {
        format!("`{}`", self.0)
    }

    /// Double-quoted form for PostgreSQL statements.
    ///
    /// Quoting also preserves the case of mixed-case names, which unquoted
    /// PostgreSQL identifiers would fold to lowercase.
    pub fn quoted_pg(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Accepted names =====

    #[test]
    fn test_accepts_simple_names() {
        for name in ["users", "Users_2024", "_hidden", "u", "123", "USERS"] {
            let ident = TableIdentifier::new(name, "MYSQL_TABLE").unwrap();
            assert_eq!(ident.as_str(), name, "value must pass through unchanged");
        }
    }

    #[test]
    fn test_accepts_long_names() {
        let name = "a".repeat(200);
        assert!(TableIdentifier::new(&name, "PG_TABLE").is_ok());
    }

    // ===== Rejected names =====

    #[test]
    fn test_rejects_empty_and_whitespace() {
        for name in ["", " ", "  ", "users table", "users\n", "\tusers"] {
            assert!(
                TableIdentifier::new(name, "MYSQL_TABLE").is_err(),
                "{:?} must be rejected",
                name
            );
        }
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for name in [
            "users; DROP TABLE users",
            "users'--",
            "users`",
            "users\"",
            "users)",
        ] {
            assert!(TableIdentifier::new(name, "PG_TABLE").is_err());
        }
    }

    #[test]
    fn test_rejects_punctuation_and_non_ascii() {
        for name in ["user-name", "schema.users", "usuários", "ユーザー", "users!"] {
            assert!(TableIdentifier::new(name, "MYSQL_TABLE").is_err());
        }
    }

    #[test]
    fn test_rejection_names_parameter_and_value() {
        let err = TableIdentifier::new("users; DROP", "MYSQL_TABLE").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MYSQL_TABLE"));
        assert!(msg.contains("users; DROP"));
    }

    // ===== Quoting =====

    #[test]
    fn test_mysql_quoting() {
        let ident = TableIdentifier::new("users", "MYSQL_TABLE").unwrap();
        assert_eq!(ident.quoted_mysql(), "`users`");
    }

    #[test]
    fn test_pg_quoting_preserves_case() {
        let ident = TableIdentifier::new("Users", "PG_TABLE").unwrap();
        assert_eq!(ident.quoted_pg(), "\"Users\"");
    }
}
