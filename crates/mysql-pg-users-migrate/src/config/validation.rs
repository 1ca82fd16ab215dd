//! Structural validation of loaded configuration.
//!
//! The environment loader fills every field with a default, so these checks
//! mostly guard configurations constructed in code and variables set to
//! whitespace. Passwords are deliberately not checked: empty is a legal
//! value for both sides.

use crate::config::Config;
use crate::error::{MigrateError, Result};

/// Check that every connection field the drivers will use is present.
pub fn validate(config: &Config) -> Result<()> {
    require(&config.source.host, "source host (MYSQL_HOST)")?;
    require(&config.source.user, "source user (MYSQL_USER)")?;
    require(&config.source.database, "source database (MYSQL_DB)")?;
    require(&config.source.table, "source table (MYSQL_TABLE)")?;
    require(&config.target.table, "target table (PG_TABLE)")?;

    // The discrete target fields only matter when no URL overrides them.
    if config.target.url.is_none() {
        require(&config.target.host, "target host (DB_HOST)")?;
        require(&config.target.user, "target user (DB_USER)")?;
        require(&config.target.database, "target database (DB_NAME)")?;
    }

    Ok(())
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MigrateError::config(format!("{} is required", what)));
    }
    Ok(())
}
