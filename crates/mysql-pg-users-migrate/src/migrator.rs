//! The migration coordinator.
//!
//! Drives one run end to end: validate identifiers, extract, normalize,
//! then load and sequence-sync inside a single target transaction. Either
//! the whole batch lands and the transaction commits, or nothing persists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::identifier::TableIdentifier;
use crate::normalize::UserBatch;
use crate::{source, target};

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub status: String,
    pub source_table: String,
    pub target_table: String,
    pub rows_extracted: u64,
    pub rows_inserted: u64,
    pub rows_skipped: u64,
    pub with_timestamps: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl MigrationReport {
    /// Serialize to pretty JSON for machine-readable output.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One-shot migration coordinator.
pub struct Migrator {
    config: Config,
}

impl Migrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the migration to completion.
    ///
    /// An empty source table is a vacuous success: the run commits (in the
    /// trivial sense) without ever touching the target.
    pub async fn run(&self) -> Result<MigrationReport> {
        let started_at = Utc::now();

        info!("Validating table identifiers");
        let source_table = TableIdentifier::new(&self.config.source.table, "MYSQL_TABLE")?;
        let target_table = TableIdentifier::new(&self.config.target.table, "PG_TABLE")?;

        let raw_rows = source::extract_all(&self.config.source, &source_table).await?;

        if raw_rows.is_empty() {
            info!(
                "No rows in source table {}; nothing to migrate",
                source_table
            );
            return Ok(self.report(&source_table, &target_table, 0, 0, false, started_at));
        }

        // Normalization happens before the target connection is even
        // opened: a bad row must never cost a transaction.
        let batch = UserBatch::from_raw(&raw_rows)?;
        info!(
            "Normalized {} rows (insert shape: {})",
            batch.len(),
            if batch.has_timestamps {
                "with timestamps"
            } else {
                "without timestamps"
            }
        );

        let mut client = target::connect(&self.config.target).await?;
        let tx = client.transaction().await?;
        info!("Transaction started on target");

        let outcome: Result<u64> = async {
            let inserted = target::load_batch(&tx, &target_table, &batch).await?;
            target::sync_sequence(&tx, &target_table).await?;
            Ok(inserted)
        }
        .await;

        let inserted = match outcome {
            Ok(inserted) => inserted,
            Err(e) => {
                error!("Migration failed during {}; rolling back", e.stage());
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                return Err(e);
            }
        };

        tx.commit().await?;

        let report = self.report(
            &source_table,
            &target_table,
            batch.len() as u64,
            inserted,
            batch.has_timestamps,
            started_at,
        );
        info!(
            "Migration complete. Rows migrated: {} ({} inserted, {} already present)",
            report.rows_extracted, report.rows_inserted, report.rows_skipped
        );
        Ok(report)
    }

    fn report(
        &self,
        source_table: &TableIdentifier,
        target_table: &TableIdentifier,
        extracted: u64,
        inserted: u64,
        with_timestamps: bool,
        started_at: DateTime<Utc>,
    ) -> MigrationReport {
        let completed_at = Utc::now();
        MigrationReport {
            status: "committed".to_string(),
            source_table: source_table.as_str().to_string(),
            target_table: target_table.as_str().to_string(),
            rows_extracted: extracted,
            rows_inserted: inserted,
            rows_skipped: extracted - inserted,
            with_timestamps,
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
        }
    }
}
