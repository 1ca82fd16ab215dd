//! Normalization of raw source rows into the canonical user shape.
//!
//! Legacy deployments of the users table named their timestamp columns in
//! several generations of styles (Spanish snake_case, Spanish camelCase,
//! English camelCase); the static alias tables below resolve them in fixed
//! priority order. Everything in this module is pure: no I/O, no handles.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::error::{MigrateError, Result};
use crate::source::{RawRow, RawValue};

/// Source-column aliases for `created_at`, highest priority first.
pub const CREATED_AT_ALIASES: [&str; 4] = [
    "created_at",
    "fecha_creacion",
    "fechaCreacion",
    "createdAt",
];

/// Source-column aliases for `updated_at`, highest priority first.
pub const UPDATED_AT_ALIASES: [&str; 4] = [
    "updated_at",
    "fecha_actualizacion",
    "fechaActualizacion",
    "updatedAt",
];

/// A user row in the canonical shape the target table expects.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl UserRow {
    pub fn has_timestamps(&self) -> bool {
        self.created_at.is_some() || self.updated_at.is_some()
    }
}

/// An ordered batch of canonical rows plus the shape flag that picks the
/// insert column list for the whole batch.
#[derive(Debug, Clone)]
pub struct UserBatch {
    pub rows: Vec<UserRow>,
    pub has_timestamps: bool,
}

impl UserBatch {
    /// Normalize a full extract, preserving source order.
    ///
    /// A single row carrying a timestamp switches the whole batch to the
    /// timestamped insert shape; rows without one then carry NULLs, so
    /// every insert in the run is uniform.
    pub fn from_raw(raw_rows: &[RawRow]) -> Result<Self> {
        let rows = raw_rows
            .iter()
            .map(normalize_row)
            .collect::<Result<Vec<_>>>()?;
        let has_timestamps = rows.iter().any(UserRow::has_timestamps);

        // Duplicate ids cannot both land (the insert skips conflicts), so
        // make the collision visible instead of resolving it silently.
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.id) {
                warn!(
                    "Duplicate id {} in source batch; only the first occurrence will be inserted",
                    row.id
                );
            }
        }

        Ok(UserBatch {
            rows,
            has_timestamps,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Map one raw row onto the canonical shape.
///
/// `id`, `name`, `email` and `password` are required; `phone` and the
/// timestamps are optional and become NULL when absent.
pub fn normalize_row(raw: &RawRow) -> Result<UserRow> {
    let id = raw
        .get("id")
        .and_then(RawValue::as_integer)
        .ok_or_else(|| MigrateError::normalize("id", "value is missing, null or not an integer"))?;

    Ok(UserRow {
        id,
        name: required_text(raw, "name", "nombre", id)?,
        email: required_text(raw, "email", "email", id)?,
        phone: raw.get("telefono").and_then(RawValue::as_text),
        password: required_text(raw, "password", "password", id)?,
        created_at: resolve_timestamp(raw, "created_at", &CREATED_AT_ALIASES, id)?,
        updated_at: resolve_timestamp(raw, "updated_at", &UPDATED_AT_ALIASES, id)?,
    })
}

fn required_text(raw: &RawRow, field: &str, column: &str, id: i64) -> Result<String> {
    raw.get(column).and_then(RawValue::as_text).ok_or_else(|| {
        MigrateError::normalize(field, format!("value is missing or null (row id {})", id))
    })
}

/// Walk the alias list; the first alias present with a usable value wins.
///
/// Null and empty-string values fall through to the next alias. A non-null
/// value that cannot be read as a timestamp is an error rather than silent
/// data loss.
fn resolve_timestamp(
    raw: &RawRow,
    field: &str,
    aliases: &[&str],
    id: i64,
) -> Result<Option<NaiveDateTime>> {
    for alias in aliases {
        let Some(value) = raw.get(alias) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if matches!(value, RawValue::Text(s) if s.trim().is_empty()) {
            continue;
        }
        let parsed = value.as_datetime().ok_or_else(|| {
            MigrateError::normalize(
                field,
                format!(
                    "column '{}' holds an unreadable timestamp {:?} (row id {})",
                    alias, value, id
                ),
            )
        })?;
        return Ok(Some(parsed));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn row(pairs: &[(&str, RawValue)]) -> RawRow {
        let mut r = RawRow::new();
        for (column, value) in pairs {
            r.set(*column, value.clone());
        }
        r
    }

    fn base_row(id: i64) -> RawRow {
        row(&[
            ("id", RawValue::Int(id)),
            ("nombre", text("Ana")),
            ("email", text("ana@x.com")),
            ("password", text("h1")),
        ])
    }

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    // ===== Field mapping =====

    #[test]
    fn test_minimal_row_normalizes_with_nulls() {
        let user = normalize_row(&base_row(1)).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@x.com");
        assert_eq!(user.phone, None);
        assert_eq!(user.password, "h1");
        assert_eq!(user.created_at, None);
        assert_eq!(user.updated_at, None);
        assert!(!user.has_timestamps());
    }

    #[test]
    fn test_full_row_maps_every_field() {
        let mut raw = base_row(3);
        raw.set("telefono", text("555-0100"));
        raw.set("created_at", RawValue::DateTime(datetime(2023, 6, 1, 9, 0, 0)));
        raw.set("updated_at", RawValue::DateTime(datetime(2024, 2, 2, 8, 30, 0)));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.phone.as_deref(), Some("555-0100"));
        assert_eq!(user.created_at, Some(datetime(2023, 6, 1, 9, 0, 0)));
        assert_eq!(user.updated_at, Some(datetime(2024, 2, 2, 8, 30, 0)));
        assert!(user.has_timestamps());
    }

    #[test]
    fn test_extra_columns_are_dropped() {
        let mut raw = base_row(4);
        raw.set("rol", text("admin"));
        raw.set("saldo", RawValue::Float(12.5));
        assert!(normalize_row(&raw).is_ok());
    }

    // ===== Required fields =====

    #[test]
    fn test_missing_id_is_a_normalization_error() {
        let raw = row(&[
            ("nombre", text("Ana")),
            ("email", text("ana@x.com")),
            ("password", text("h1")),
        ]);
        let err = normalize_row(&raw).unwrap_err();
        assert!(matches!(err, MigrateError::Normalize { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_null_required_field_names_the_field_and_row() {
        for (column, field) in [("nombre", "name"), ("email", "email"), ("password", "password")] {
            let mut raw = base_row(7);
            raw.set(column, RawValue::Null);
            let err = normalize_row(&raw).unwrap_err();
            match err {
                MigrateError::Normalize { field: f, detail } => {
                    assert_eq!(f, field);
                    assert!(detail.contains("row id 7"), "{}", detail);
                }
                other => panic!("expected Normalize error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_id_coerces_from_numeric_text_and_unsigned() {
        let mut raw = base_row(0);
        raw.set("id", text("42"));
        assert_eq!(normalize_row(&raw).unwrap().id, 42);

        raw.set("id", RawValue::Uint(42));
        assert_eq!(normalize_row(&raw).unwrap().id, 42);
    }

    #[test]
    fn test_numeric_phone_coerces_to_text() {
        let mut raw = base_row(5);
        raw.set("telefono", RawValue::Int(5550100));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.phone.as_deref(), Some("5550100"));
    }

    #[test]
    fn test_null_phone_stays_null() {
        let mut raw = base_row(6);
        raw.set("telefono", RawValue::Null);
        assert_eq!(normalize_row(&raw).unwrap().phone, None);
    }

    // ===== Timestamp alias resolution =====

    #[test]
    fn test_created_at_beats_every_alias() {
        let mut raw = base_row(1);
        raw.set("created_at", RawValue::DateTime(datetime(2024, 1, 1, 0, 0, 0)));
        raw.set("fecha_creacion", RawValue::DateTime(datetime(2020, 1, 1, 0, 0, 0)));
        raw.set("fechaCreacion", RawValue::DateTime(datetime(2021, 1, 1, 0, 0, 0)));
        raw.set("createdAt", RawValue::DateTime(datetime(2022, 1, 1, 0, 0, 0)));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.created_at, Some(datetime(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_alias_priority_order_is_fixed() {
        let mut raw = base_row(1);
        raw.set("fechaCreacion", RawValue::DateTime(datetime(2021, 1, 1, 0, 0, 0)));
        raw.set("createdAt", RawValue::DateTime(datetime(2022, 1, 1, 0, 0, 0)));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(
            user.created_at,
            Some(datetime(2021, 1, 1, 0, 0, 0)),
            "fechaCreacion outranks createdAt"
        );
    }

    #[test]
    fn test_null_alias_falls_through_to_next() {
        let mut raw = base_row(1);
        raw.set("created_at", RawValue::Null);
        raw.set("fecha_creacion", RawValue::DateTime(datetime(2020, 5, 5, 5, 5, 5)));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.created_at, Some(datetime(2020, 5, 5, 5, 5, 5)));
    }

    #[test]
    fn test_empty_string_alias_falls_through_to_next() {
        let mut raw = base_row(1);
        raw.set("updated_at", text(""));
        raw.set("fecha_actualizacion", RawValue::DateTime(datetime(2024, 3, 3, 3, 3, 3)));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.updated_at, Some(datetime(2024, 3, 3, 3, 3, 3)));
    }

    #[test]
    fn test_no_alias_present_means_null() {
        let user = normalize_row(&base_row(1)).unwrap();
        assert_eq!(user.created_at, None);
        assert_eq!(user.updated_at, None);
    }

    #[test]
    fn test_date_only_text_promotes_to_midnight() {
        let mut raw = base_row(2);
        raw.set("fecha_creacion", text("2024-01-01"));
        let user = normalize_row(&raw).unwrap();
        assert_eq!(user.created_at, Some(datetime(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_unreadable_timestamp_is_an_error_not_silent_loss() {
        let mut raw = base_row(9);
        raw.set("created_at", text("hace dos semanas"));
        let err = normalize_row(&raw).unwrap_err();
        match err {
            MigrateError::Normalize { field, detail } => {
                assert_eq!(field, "created_at");
                assert!(detail.contains("row id 9"), "{}", detail);
            }
            other => panic!("expected Normalize error, got {:?}", other),
        }
    }

    // ===== Batch shape =====

    #[test]
    fn test_batch_without_timestamps_keeps_plain_shape() {
        let batch = UserBatch::from_raw(&[base_row(1), base_row(2)]).unwrap();
        assert!(!batch.has_timestamps);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_one_timestamped_row_switches_the_whole_batch() {
        let mut second = base_row(2);
        second.set("fecha_creacion", text("2024-01-01"));
        let batch = UserBatch::from_raw(&[base_row(1), second]).unwrap();
        assert!(batch.has_timestamps);
        // The untimestamped row still has no values; it will be inserted
        // with NULLs under the shared 7-column shape.
        assert!(!batch.rows[0].has_timestamps());
        assert!(batch.rows[1].has_timestamps());
    }

    #[test]
    fn test_batch_preserves_source_order() {
        let batch = UserBatch::from_raw(&[base_row(5), base_row(3), base_row(8)]).unwrap();
        let ids: Vec<i64> = batch.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 3, 8]);
    }

    #[test]
    fn test_batch_keeps_duplicate_ids_for_first_wins_insert() {
        let batch = UserBatch::from_raw(&[base_row(1), base_row(1)]).unwrap();
        assert_eq!(batch.len(), 2, "duplicates are flagged, not removed");
    }

    #[test]
    fn test_batch_error_aborts_on_first_bad_row() {
        let mut bad = base_row(2);
        bad.set("email", RawValue::Null);
        assert!(UserBatch::from_raw(&[base_row(1), bad]).is_err());
    }

    // ===== The reference scenario =====

    #[test]
    fn test_mixed_legacy_rows_normalize_end_to_end() {
        let ana = row(&[
            ("id", RawValue::Int(1)),
            ("nombre", text("Ana")),
            ("email", text("a@x.com")),
            ("telefono", RawValue::Null),
            ("password", text("h1")),
        ]);
        let bo = row(&[
            ("id", RawValue::Int(2)),
            ("nombre", text("Bo")),
            ("email", text("b@x.com")),
            ("telefono", text("555")),
            ("password", text("h2")),
            ("fecha_creacion", text("2024-01-01")),
        ]);

        let batch = UserBatch::from_raw(&[ana, bo]).unwrap();
        assert!(batch.has_timestamps, "Bo's legacy timestamp sets the shape");

        assert_eq!(batch.rows[0].phone, None);
        assert_eq!(batch.rows[0].created_at, None);
        assert_eq!(batch.rows[0].updated_at, None);

        assert_eq!(batch.rows[1].phone.as_deref(), Some("555"));
        assert_eq!(batch.rows[1].created_at, Some(datetime(2024, 1, 1, 0, 0, 0)));
        assert_eq!(batch.rows[1].updated_at, None);
    }
}
