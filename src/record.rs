//! Records as JSON maps keyed by field name, body decoding and paging parameters.

use crate::config::{ColumnDefault, ColumnDescriptor, ColumnType, ResourceDescriptor};
use crate::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One row of a resource. Keys are JSON field names; a key that is absent was not
/// supplied, a key holding `null` clears a nullable column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Primary key value, if present and an in-range integer.
    pub fn id(&self, desc: &ResourceDescriptor) -> Option<i32> {
        self.get(&desc.primary_key().json_field_name)
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
    }

    /// Copy every field of `patch` onto `self`, except the primary key.
    pub fn merge(&mut self, desc: &ResourceDescriptor, patch: &Record) {
        let pk = &desc.primary_key().json_field_name;
        for (k, v) in &patch.0 {
            if k != pk {
                self.0.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Decode a request body into a record of `desc`. Unknown keys are dropped.
pub fn decode(desc: &ResourceDescriptor, body: &[u8]) -> Result<Record, AppError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AppError::bad_params(format!("body: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(AppError::bad_params("body must be a JSON object"));
    };

    let mut record = Record::new();
    for (key, v) in map {
        let Some(col) = desc.column_by_json(&key) else {
            continue;
        };
        if v.is_null() {
            if col.nullable {
                record.insert(key, Value::Null);
            }
            continue;
        }
        let v = coerce(col, v)?;
        record.insert(key, v);
    }
    Ok(record)
}

fn coerce(col: &ColumnDescriptor, v: Value) -> Result<Value, AppError> {
    let mismatch = || AppError::bad_params(format!("{}: expected {}", col.json_field_name, col.database_type_pretty));
    match col.kind {
        ColumnType::Int => {
            let n = v.as_i64().ok_or_else(mismatch)?;
            i32::try_from(n).map_err(|_| mismatch())?;
            Ok(Value::from(n))
        }
        ColumnType::BigInt => v.as_i64().map(Value::from).ok_or_else(mismatch),
        ColumnType::Varchar(_) | ColumnType::Text => match v {
            Value::String(_) => Ok(v),
            _ => Err(mismatch()),
        },
        ColumnType::DateTime => {
            let s = v.as_str().ok_or_else(mismatch)?;
            let t = parse_datetime(s).ok_or_else(mismatch)?;
            Ok(Value::String(format_datetime(&t)))
        }
    }
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

pub fn format_datetime(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Fill every column a create body left out: timestamp defaults get `now`, literal
/// defaults their value, nullable columns null, the rest the zero value of their type.
/// The primary key stays absent so the store assigns it.
pub fn fill_defaults(desc: &ResourceDescriptor, record: &mut Record, now: DateTime<Utc>) {
    for col in desc.data_columns() {
        if record.contains(&col.json_field_name) {
            continue;
        }
        let v = match &col.default {
            Some(ColumnDefault::CurrentTimestamp) => Value::String(format_datetime(&now)),
            Some(ColumnDefault::Value(v)) => v.clone(),
            None if col.nullable => Value::Null,
            None => col.kind.zero_value(),
        };
        record.insert(col.json_field_name.clone(), v);
    }
}

/// Path id: a 32-bit signed integer.
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::bad_params(format!("invalid id: {}", raw)))
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Query parameters of a list request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListParams {
    pub page: i64,
    pub page_size: i64,
    pub order: String,
}

impl ListParams {
    /// `page` and `pagesize` must be integers when present; defaults are 0 and 20.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, AppError> {
        let int = |key: &str, default: i64| -> Result<i64, AppError> {
            match query.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                None => Ok(default),
                Some(s) => s
                    .parse()
                    .map_err(|_| AppError::bad_params(format!("{} is not an integer: {}", key, s))),
            }
        };
        Ok(ListParams {
            page: int("page", 0)?,
            page_size: int("pagesize", DEFAULT_PAGE_SIZE)?,
            order: query.get("order").cloned().unwrap_or_default(),
        })
    }

    pub fn window(&self) -> Result<PageWindow, AppError> {
        PageWindow::new(self.page, self.page_size)
    }
}

/// `(offset, limit)` derived from page and page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Page 0 and page 1 both start at offset 0.
    pub fn new(page: i64, page_size: i64) -> Result<Self, AppError> {
        if page < 0 {
            return Err(AppError::bad_params("page < 0"));
        }
        if page_size <= 0 {
            return Err(AppError::bad_params("pagesize <= 0"));
        }
        let offset = if page == 0 {
            0
        } else {
            (page - 1)
                .checked_mul(page_size)
                .ok_or_else(|| AppError::bad_params("page window overflows"))?
        };
        Ok(PageWindow {
            offset,
            limit: page_size,
        })
    }
}
