//! Untyped source rows.
//!
//! `SELECT *` over a legacy table returns columns this tool has no schema
//! for, so values travel in a small dynamic enum keyed by column name. The
//! normalizer picks out the handful of columns it cares about and drops the
//! rest.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// A single dynamically-typed column value read from MySQL.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Integer view. Unsigned values must fit `i64`; numeric text is
    /// accepted because legacy id columns are sometimes VARCHAR.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            RawValue::Uint(v) => i64::try_from(*v).ok(),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view. Integers coerce because legacy schemas store phone
    /// numbers in numeric columns.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Int(v) => Some(v.to_string()),
            RawValue::Uint(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Datetime view. Date-only values promote to midnight; text parses in
    /// the formats MySQL dumps actually contain.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            RawValue::DateTime(v) => Some(*v),
            RawValue::Date(v) => v.and_hms_opt(0, 0, 0),
            RawValue::Text(s) => parse_datetime_text(s.trim()),
            _ => None,
        }
    }
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One source row: an untyped mapping from column name to value.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    columns: HashMap<String, RawValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: RawValue) {
        self.columns.insert(column.into(), value);
    }

    /// Value of `column`, or `None` if the source table has no such column.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
