//! Environment-driven configuration.
//!
//! All behavior is parameterized through environment variables; the tool
//! takes no command-line flags. Unset *or empty* variables fall back to
//! their defaults (empty means "not set" for everything except passwords,
//! whose default is the empty string).
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `MYSQL_HOST` | `localhost` | source host |
//! | `MYSQL_PORT` | `3306` | source port |
//! | `MYSQL_USER` | `root` | source user |
//! | `MYSQL_PASSWORD` | empty | source password |
//! | `MYSQL_DB` | `usuarios_db` | source database |
//! | `MYSQL_TABLE` | `users` | source table |
//! | `DB_HOST` | `localhost` | target host |
//! | `DB_PORT` | `5432` | target port |
//! | `DB_USER` | `postgres` | target user |
//! | `DB_PASSWORD` | empty | target password |
//! | `DB_NAME` | `postgres` | target database |
//! | `DB_SSL` | off | `true` enables relaxed-verification TLS |
//! | `PG_TABLE` | `users` | target table |
//! | `DATABASE_URL` | unset | overrides the discrete target fields |

mod types;
mod validation;

pub use types::{Config, SourceConfig, TargetConfig};

use crate::error::{MigrateError, Result};

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Tests use this to avoid touching process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let source = SourceConfig {
            host: get("MYSQL_HOST", "localhost"),
            port: parse_port(&get("MYSQL_PORT", "3306"), "MYSQL_PORT")?,
            user: get("MYSQL_USER", "root"),
            password: lookup("MYSQL_PASSWORD").unwrap_or_default(),
            database: get("MYSQL_DB", "usuarios_db"),
            table: get("MYSQL_TABLE", "users"),
        };

        let target = TargetConfig {
            host: get("DB_HOST", "localhost"),
            port: parse_port(&get("DB_PORT", "5432"), "DB_PORT")?,
            user: get("DB_USER", "postgres"),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database: get("DB_NAME", "postgres"),
            // Exact match, same as the interface this replaces: anything
            // other than the literal string "true" leaves TLS off.
            ssl: lookup("DB_SSL").as_deref() == Some("true"),
            table: get("PG_TABLE", "users"),
            url: lookup("DATABASE_URL").filter(|value| !value.is_empty()),
        };

        let config = Config { source, target };
        validation::validate(&config)?;
        Ok(config)
    }
}

fn parse_port(value: &str, param: &str) -> Result<u16> {
    value.parse::<u16>().map_err(|_| {
        MigrateError::config(format!(
            "Invalid {}: '{}' is not a valid port number",
            param, value
        ))
    })
}
