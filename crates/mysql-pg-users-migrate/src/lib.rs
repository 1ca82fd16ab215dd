//! # mysql-pg-users-migrate
//!
//! One-shot migration of a legacy MySQL `users` table into PostgreSQL.
//!
//! The pipeline validates both table identifiers, extracts the full source
//! table, normalizes legacy column layouts into one canonical row shape,
//! and loads the batch inside a single target-side transaction with
//! conflict-skipping inserts, finishing with an id-sequence resync so the
//! next generated id lands above every migrated row. Re-runs are safe:
//! existing ids are skipped, never updated.
//!
//! Configuration comes entirely from environment variables; see the
//! [`config`] module for the full list.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_pg_users_migrate::{Config, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let report = Migrator::new(config).run().await?;
//!     println!("Migrated {} rows", report.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod identifier;
pub mod migrator;
pub mod normalize;
pub mod source;
pub mod target;

// Re-exports for convenient access
pub use config::{Config, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use identifier::TableIdentifier;
pub use migrator::{MigrationReport, Migrator};
pub use normalize::{UserBatch, UserRow};
pub use source::{RawRow, RawValue};
