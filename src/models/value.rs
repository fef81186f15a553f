use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};

use crate::models::ReferenceId;

pub const DATE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell of a loaded row. Database scalars arrive as the first five
/// variants; the loader's post-processing passes introduce the rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
    RefList(Vec<String>),
    Files(Vec<FileEntry>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell, accepting int, float, or numeric string.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Real(f) => Some(*f as i64),
            CellValue::Text(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference_id(&self) -> Option<ReferenceId> {
        match self {
            CellValue::Text(s) => ReferenceId::parse(s).ok(),
            CellValue::Blob(b) => ReferenceId::from_slice(b).ok(),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> CellValue {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Real(f),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl From<CellValue> for Value {
    fn from(value: CellValue) -> Value {
        match value {
            CellValue::Null => Value::Null,
            CellValue::Integer(i) => Value::Integer(i),
            CellValue::Real(f) => Value::Real(f),
            CellValue::Text(s) => Value::Text(s),
            CellValue::Blob(b) => Value::Blob(b),
            CellValue::DateTime(dt) => Value::Text(dt.format(DATE_LAYOUT).to_string()),
            CellValue::RefList(refs) => {
                Value::Text(serde_json::to_string(&refs).unwrap_or_default())
            }
            CellValue::Files(files) => {
                Value::Text(serde_json::to_string(&files).unwrap_or_default())
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> CellValue {
        CellValue::Integer(value)
    }
}

/// One entry of a file-column manifest. Unknown keys survive round trips via
/// the catch-all map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The map-shaped row contract: column name to cell value, plus the
/// synthetic `__type` key.
pub type Row = HashMap<String, CellValue>;

pub const TYPE_KEY: &str = "__type";

pub trait RowExt {
    fn type_name(&self) -> Option<&str>;
    fn reference_id(&self) -> Option<ReferenceId>;
    fn row_id(&self) -> Option<i64>;
    /// The `reference_id` cell, falling back to `id` rendered as text.
    fn reference_key(&self) -> Option<String>;
}

impl RowExt for Row {
    fn type_name(&self) -> Option<&str> {
        self.get(TYPE_KEY).and_then(|v| v.as_text())
    }

    fn reference_id(&self) -> Option<ReferenceId> {
        self.get("reference_id").and_then(|v| v.as_reference_id())
    }

    fn row_id(&self) -> Option<i64> {
        self.get("id").and_then(|v| v.as_i64())
    }

    fn reference_key(&self) -> Option<String> {
        match self.get("reference_id") {
            Some(CellValue::Text(s)) => Some(s.clone()),
            Some(CellValue::Blob(b)) => ReferenceId::from_slice(b).ok().map(|r| r.to_string()),
            _ => self.get("id").and_then(|v| v.as_i64()).map(|i| i.to_string()),
        }
    }
}

/// Best-effort parse of a time-of-day value. The date half is pinned to the
/// epoch so the result stays a datetime.
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    for layout in ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(value, layout) {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
            return Some(epoch.and_time(t));
        }
    }
    None
}

/// Best-effort parse of a date or datetime value: ISO-8601 with or without
/// timezone, with or without seconds, with or without the time half.
pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for layout in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        DATE_LAYOUT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

/// Time-only forms are tried first, then the date and datetime forms.
pub fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    parse_time(value).or_else(|| parse_date_time(value))
}
