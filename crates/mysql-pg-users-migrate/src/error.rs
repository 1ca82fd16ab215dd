//! Error types for the migration pipeline.

use thiserror::Error;

/// Errors produced while migrating the users table.
///
/// Every failure mode of the pipeline maps onto exactly one variant and all
/// of them are fatal: this tool performs a single attempt, no retries.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Invalid configuration: bad table identifier, malformed environment
    /// value, structurally incomplete connection settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source MySQL server could not be reached or refused the session.
    #[error("Source database unavailable: {0}")]
    SourceUnavailable(String),

    /// The source SELECT failed, or a fetched row could not be decoded.
    #[error("Source query failed: {0}")]
    SourceQuery(String),

    /// A source row could not be normalized into the canonical user shape.
    #[error("Normalization failed for field '{field}': {detail}")]
    Normalize { field: String, detail: String },

    /// A row-level insert into the target failed. Carries the id of the
    /// offending row; the coordinator rolls the transaction back.
    #[error("Insert failed for row id {row_id}: {source}")]
    Load {
        row_id: i64,
        #[source]
        source: tokio_postgres::Error,
    },

    /// The id sequence backing the target table could not be recalibrated.
    #[error("Sequence sync failed for table '{table}': {detail}")]
    SequenceSync { table: String, detail: String },

    /// Target-side failure outside the per-row insert path: connect, begin,
    /// prepare, commit.
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),
}

impl MigrateError {
    /// Create a Config error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        MigrateError::Config(msg.into())
    }

    /// Create a SourceUnavailable error from any displayable cause.
    pub fn source_unavailable(err: impl std::fmt::Display) -> Self {
        MigrateError::SourceUnavailable(err.to_string())
    }

    /// Create a SourceQuery error from any displayable cause.
    pub fn source_query(err: impl std::fmt::Display) -> Self {
        MigrateError::SourceQuery(err.to_string())
    }

    /// Create a Normalize error for a canonical field.
    pub fn normalize(field: impl Into<String>, detail: impl Into<String>) -> Self {
        MigrateError::Normalize {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Create a Load error for a specific row.
    pub fn load(row_id: i64, source: tokio_postgres::Error) -> Self {
        MigrateError::Load { row_id, source }
    }

    /// Create a SequenceSync error for a table.
    pub fn sequence_sync(table: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        MigrateError::SequenceSync {
            table: table.into(),
            detail: detail.to_string(),
        }
    }

    /// Pipeline stage this error belongs to, for the operator-facing
    /// diagnostic line.
    pub fn stage(&self) -> &'static str {
        match self {
            MigrateError::Config(_) => "validation",
            MigrateError::SourceUnavailable(_) | MigrateError::SourceQuery(_) => "extraction",
            MigrateError::Normalize { .. } => "normalization",
            MigrateError::Load { .. } => "loading",
            MigrateError::SequenceSync { .. } => "sequence sync",
            MigrateError::Target(_) => "target I/O",
        }
    }

    /// Process exit code for this error category. Zero is reserved for
    /// success; every category maps to its own nonzero code.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Target(_) => 1,
            MigrateError::Config(_) => 2,
            MigrateError::SourceUnavailable(_) => 3,
            MigrateError::SourceQuery(_) => 4,
            MigrateError::Normalize { .. } => 5,
            MigrateError::Load { .. } => 6,
            MigrateError::SequenceSync { .. } => 7,
        }
    }

    /// Format the error with its full cause chain for terminal output.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("{}", self);
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            output.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        output
    }
}

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, MigrateError>;
