//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::ValidationRule;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Semantic column type. Drives body decoding, SQL binding and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    Varchar(u32),
    Text,
    DateTime,
}

impl ColumnType {
    pub fn database_type_name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Varchar(_) => "varchar",
            ColumnType::Text => "text",
            ColumnType::DateTime => "datetime",
        }
    }

    pub fn database_type_pretty(&self) -> String {
        match self {
            ColumnType::Varchar(n) => format!("varchar({})", n),
            other => other.database_type_name().to_string(),
        }
    }

    pub fn length(&self) -> i64 {
        match self {
            ColumnType::Varchar(n) => i64::from(*n),
            _ => -1,
        }
    }

    /// PostgreSQL column type for bootstrap DDL.
    pub fn pg_type(&self) -> String {
        match self {
            ColumnType::Int => "INTEGER".into(),
            ColumnType::BigInt => "BIGINT".into(),
            ColumnType::Varchar(n) => format!("VARCHAR({})", n),
            ColumnType::Text => "TEXT".into(),
            ColumnType::DateTime => "TIMESTAMPTZ".into(),
        }
    }

    /// Value a non-nullable column takes when neither the body nor a default supplies one.
    pub fn zero_value(&self) -> Value {
        match self {
            ColumnType::Int | ColumnType::BigInt => Value::from(0),
            ColumnType::Varchar(_) | ColumnType::Text => Value::String(String::new()),
            ColumnType::DateTime => Value::String("0001-01-01T00:00:00Z".into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnDefault {
    CurrentTimestamp,
    Value(Value),
}

#[derive(Clone, Debug, Serialize)]
pub struct ColumnDescriptor {
    pub index: usize,
    pub name: String,
    pub comment: String,
    pub nullable: bool,
    pub database_type_name: &'static str,
    pub database_type_pretty: String,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub column_length: i64,
    pub json_field_name: String,
    #[serde(skip)]
    pub kind: ColumnType,
    #[serde(skip)]
    pub default: Option<ColumnDefault>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(skip)]
    pub primary_key_index: usize,
    /// Keyed by JSON field name.
    #[serde(skip)]
    pub validation: HashMap<String, ValidationRule>,
}

impl ResourceDescriptor {
    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.primary_key_index]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_by_json(&self, json_name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.json_field_name == json_name)
    }

    /// Every column except the primary key, in declaration order.
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_primary_key)
    }
}
