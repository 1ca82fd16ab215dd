//! Target-side loading: PostgreSQL connection, conflict-skipping inserts
//! and the id-sequence resync.
//!
//! Everything here that writes runs against a caller-supplied transaction;
//! the commit/rollback decision belongs to the migrator alone.

mod tls;

use std::str::FromStr;
use std::time::Duration;

use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls, Socket, Transaction};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use crate::identifier::TableIdentifier;
use crate::normalize::UserBatch;

/// Ceiling for the target handshake (the original tool's 10 s limit).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open the target connection.
///
/// `DATABASE_URL`, when set, wins over the discrete connection fields;
/// `DB_SSL` decides TLS either way. The connection driver task is spawned
/// here and lives until the client is dropped.
pub async fn connect(config: &TargetConfig) -> Result<Client> {
    let mut pg_config = match &config.url {
        Some(url) => PgConfig::from_str(url)?,
        None => {
            let mut c = PgConfig::new();
            c.host(&config.host)
                .port(config.port)
                .user(&config.user)
                .password(&config.password)
                .dbname(&config.database);
            c
        }
    };
    pg_config
        .connect_timeout(CONNECT_TIMEOUT)
        .application_name("mysql-pg-users-migrate");

    let client = if config.ssl {
        connect_with(&pg_config, tls::make_tls_connect()).await?
    } else {
        connect_with(&pg_config, NoTls).await?
    };

    info!(
        "Connected to PostgreSQL target: {}",
        if config.url.is_some() {
            "via DATABASE_URL".to_string()
        } else {
            format!("{}:{}/{}", config.host, config.port, config.database)
        }
    );
    Ok(client)
}

async fn connect_with<T>(pg_config: &PgConfig, tls: T) -> Result<Client>
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let (client, connection) = pg_config.connect(tls).await?;
    // The driver task multiplexes the socket; it ends when the client is
    // dropped, and an error after that point is only worth a log line.
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("Target connection task ended with error: {}", e);
        }
    });
    Ok(client)
}

/// Insert statement text for one batch shape.
///
/// Target columns keep the legacy names; the timestamped shape adds the two
/// timestamp columns for every row of the batch, so the statement is
/// uniform across the run.
fn insert_sql(table: &TableIdentifier, has_timestamps: bool) -> String {
    if has_timestamps {
        format!(
            "INSERT INTO {} (id, nombre, email, telefono, password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO NOTHING",
            table.quoted_pg()
        )
    } else {
        format!(
            "INSERT INTO {} (id, nombre, email, telefono, password) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO NOTHING",
            table.quoted_pg()
        )
    }
}

/// Parameter types for the insert, pinned so the server casts toward the
/// actual column types instead of inferring from them.
const PLAIN_PARAM_TYPES: [Type; 5] = [Type::INT8, Type::TEXT, Type::TEXT, Type::TEXT, Type::TEXT];
const TIMESTAMPED_PARAM_TYPES: [Type; 7] = [
    Type::INT8,
    Type::TEXT,
    Type::TEXT,
    Type::TEXT,
    Type::TEXT,
    Type::TIMESTAMP,
    Type::TIMESTAMP,
];

/// Insert every row of the batch inside the caller's transaction.
///
/// Rows whose id already exists in the target are skipped, never updated;
/// the return value counts rows actually inserted. The first row that fails
/// for any other reason aborts the load with its id attached; partial
/// recovery is the migrator's call, not ours.
pub async fn load_batch(
    tx: &Transaction<'_>,
    table: &TableIdentifier,
    batch: &UserBatch,
) -> Result<u64> {
    let sql = insert_sql(table, batch.has_timestamps);
    debug!("Insert statement: {}", sql);
    let param_types: &[Type] = if batch.has_timestamps {
        &TIMESTAMPED_PARAM_TYPES
    } else {
        &PLAIN_PARAM_TYPES
    };
    let statement = tx.prepare_typed(&sql, param_types).await?;

    let mut inserted = 0u64;
    for row in &batch.rows {
        let affected = if batch.has_timestamps {
            let params: [&(dyn ToSql + Sync); 7] = [
                &row.id,
                &row.name,
                &row.email,
                &row.phone,
                &row.password,
                &row.created_at,
                &row.updated_at,
            ];
            tx.execute(&statement, &params).await
        } else {
            let params: [&(dyn ToSql + Sync); 5] =
                [&row.id, &row.name, &row.email, &row.phone, &row.password];
            tx.execute(&statement, &params).await
        }
        .map_err(|e| MigrateError::load(row.id, e))?;

        if affected == 0 {
            debug!("Row id {} already present in target, skipped", row.id);
        }
        inserted += affected;
    }

    info!(
        "Loaded {} of {} rows into target table {} ({} already present)",
        inserted,
        batch.len(),
        table,
        batch.len() as u64 - inserted
    );
    Ok(inserted)
}

fn setval_sql(table: &TableIdentifier) -> String {
    format!(
        "SELECT setval($1::regclass, COALESCE((SELECT MAX(id) FROM {}), 1))",
        table.quoted_pg()
    )
}

/// The table-name argument for the `pg_get_serial_sequence` probe.
///
/// The function parses its first argument as SQL text, so an unquoted name
/// would case-fold to lowercase while the inserts write to the quoted,
/// case-preserved relation. Binding the quoted form keeps the probe aimed
/// at the same table the loader filled.
fn sequence_probe_target(table: &TableIdentifier) -> String {
    table.quoted_pg()
}

/// Recalibrate the sequence behind the target table's id column.
///
/// The loader writes explicit ids past the generator, so without this step
/// the next organically-created row could collide with a migrated id. Runs
/// inside the same transaction as the load: a stale sequence is a corrupt
/// end state, and failing here rolls the whole run back.
pub async fn sync_sequence(tx: &Transaction<'_>, table: &TableIdentifier) -> Result<()> {
    let probe = tx
        .query_one(
            "SELECT pg_get_serial_sequence($1, 'id')",
            &[&sequence_probe_target(table)],
        )
        .await
        .map_err(|e| MigrateError::sequence_sync(table.as_str(), e))?;
    let sequence: Option<String> = probe.get(0);
    let Some(sequence) = sequence else {
        return Err(MigrateError::sequence_sync(
            table.as_str(),
            "column 'id' is not backed by a sequence",
        ));
    };

    let row = tx
        .query_one(&setval_sql(table), &[&sequence])
        .await
        .map_err(|e| MigrateError::sequence_sync(table.as_str(), e))?;
    let value: i64 = row.get(0);
    info!("Sequence {} recalibrated to {}", sequence, value);
    Ok(())
}
