//! Source-side extraction: one full read of the MySQL users table.

mod row;

pub use row::{RawRow, RawValue};

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{MigrateError, Result};
use crate::identifier::TableIdentifier;

/// Ceiling for the initial handshake: DNS, TCP, auth.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read every row of the source table.
///
/// Owns its connection for the whole call: opened here, released here on
/// every path, before any target-side work starts.
pub async fn extract_all(config: &SourceConfig, table: &TableIdentifier) -> Result<Vec<RawRow>> {
    let mut conn = connect(config).await?;

    let sql = format!("SELECT * FROM {}", table.quoted_mysql());
    debug!("Source query: {}", sql);
    let fetched = sqlx::query(&sql).fetch_all(&mut conn).await;

    // The connection is finished with regardless of how the query went.
    if let Err(e) = conn.close().await {
        warn!("Failed to close source connection cleanly: {}", e);
    }

    let rows = fetched.map_err(MigrateError::source_query)?;
    info!("Extracted {} rows from source table {}", rows.len(), table);

    rows.iter().map(decode_row).collect()
}

async fn connect(config: &SourceConfig) -> Result<MySqlConnection> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let conn = tokio::time::timeout(CONNECT_TIMEOUT, options.connect())
        .await
        .map_err(|_| {
            MigrateError::source_unavailable(format!(
                "connect to {}:{} timed out after {}s",
                config.host,
                config.port,
                CONNECT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(MigrateError::source_unavailable)?;

    info!(
        "Connected to MySQL source: {}:{}/{}",
        config.host, config.port, config.database
    );
    Ok(conn)
}

fn decode_row(row: &MySqlRow) -> Result<RawRow> {
    let mut out = RawRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, index, column.type_info().name(), column.name())?;
        out.set(column.name(), value);
    }
    Ok(out)
}

/// Decode one column keyed on the driver's type name.
///
/// Only the canonical columns end up typed-critical; everything else just
/// needs to survive the trip and gets a best-effort representation.
fn decode_value(row: &MySqlRow, index: usize, type_name: &str, column: &str) -> Result<RawValue> {
    let raw = row.try_get_raw(index).map_err(MigrateError::source_query)?;
    if raw.is_null() {
        return Ok(RawValue::Null);
    }

    let decoded = match type_name {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(RawValue::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).map(RawValue::Int)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(RawValue::Uint),
        // BIT(1) decodes as bool, wider bit fields as u64.
        "BIT" => row
            .try_get::<u64, _>(index)
            .map(RawValue::Uint)
            .or_else(|_| row.try_get::<bool, _>(index).map(RawValue::Bool)),
        "YEAR" => row.try_get::<u16, _>(index).map(|v| RawValue::Int(i64::from(v))),
        "FLOAT" => row
            .try_get::<f32, _>(index)
            .map(|v| RawValue::Float(f64::from(v))),
        "DOUBLE" => row.try_get::<f64, _>(index).map(RawValue::Float),
        "DECIMAL" => row.try_get::<Decimal, _>(index).map(RawValue::Decimal),
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            row.try_get::<String, _>(index).map(RawValue::Text)
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            row.try_get::<Vec<u8>, _>(index).map(RawValue::Bytes)
        }
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(RawValue::DateTime),
        "DATE" => row.try_get::<NaiveDate, _>(index).map(RawValue::Date),
        "TIME" => row.try_get::<NaiveTime, _>(index).map(RawValue::Time),
        other => match row.try_get::<String, _>(index) {
            Ok(v) => Ok(RawValue::Text(v)),
            Err(_) => {
                warn!(
                    "Column '{}' has unsupported type {}, carrying as NULL",
                    column, other
                );
                return Ok(RawValue::Null);
            }
        },
    };

    decoded.map_err(|e| {
        MigrateError::source_query(format!(
            "failed to decode column '{}' ({}): {}",
            column, type_name, e
        ))
    })
}
