//! Typed bind values: JSON field values converted per column type before binding.

use crate::config::ColumnType;
use crate::record::parse_datetime;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a PostgreSQL placeholder. `None` binds a typed NULL.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Int(Option<i32>),
    BigInt(Option<i64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

impl BindValue {
    pub fn from_json(kind: ColumnType, v: &Value) -> Result<Self, StoreError> {
        let invalid = || StoreError::Invalid(format!("{} for {}", v, kind.database_type_pretty()));
        if v.is_null() {
            return Ok(match kind {
                ColumnType::Int => BindValue::Int(None),
                ColumnType::BigInt => BindValue::BigInt(None),
                ColumnType::Varchar(_) | ColumnType::Text => BindValue::Text(None),
                ColumnType::DateTime => BindValue::Timestamp(None),
            });
        }
        Ok(match kind {
            ColumnType::Int => {
                let n = v.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(invalid)?;
                BindValue::Int(Some(n))
            }
            ColumnType::BigInt => BindValue::BigInt(Some(v.as_i64().ok_or_else(invalid)?)),
            ColumnType::Varchar(_) | ColumnType::Text => {
                BindValue::Text(Some(v.as_str().ok_or_else(invalid)?.to_string()))
            }
            ColumnType::DateTime => {
                let t = v.as_str().and_then(parse_datetime).ok_or_else(invalid)?;
                BindValue::Timestamp(Some(t))
            }
        })
    }

    pub fn bind(self, query: Query<'_, Postgres, PgArguments>) -> Query<'_, Postgres, PgArguments> {
        match self {
            BindValue::Int(v) => query.bind(v),
            BindValue::BigInt(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
            BindValue::Timestamp(v) => query.bind(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_by_column_type() {
        assert_eq!(BindValue::from_json(ColumnType::Int, &Value::from(7)).unwrap(), BindValue::Int(Some(7)));
        assert_eq!(BindValue::from_json(ColumnType::Text, &Value::Null).unwrap(), BindValue::Text(None));
        assert!(BindValue::from_json(ColumnType::Int, &Value::from(i64::MAX)).is_err());
        assert!(BindValue::from_json(ColumnType::Varchar(8), &Value::from(1)).is_err());
        let t = BindValue::from_json(ColumnType::DateTime, &Value::from("2020-01-02T03:04:05Z")).unwrap();
        assert!(matches!(t, BindValue::Timestamp(Some(_))));
    }
}
