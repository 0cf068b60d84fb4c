//! Load table declarations (embedded or from a file) and resolve them into descriptors.

use crate::config::resolved::{ColumnDefault, ColumnDescriptor, ColumnType, ResourceDescriptor};
use crate::config::types::*;
use crate::config::{validate, FullConfig};
use crate::error::ConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_RESOURCES: &str = include_str!("resources.json");

/// The seven tables the admin site manages.
pub fn builtin() -> Result<FullConfig, ConfigError> {
    serde_json::from_str(BUILTIN_RESOURCES).map_err(|e| ConfigError::Load(e.to_string()))
}

pub async fn load_from_path(path: &Path) -> Result<FullConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Build resolved descriptors from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    validate(config)?;

    let mut out = Vec::with_capacity(config.tables.len());
    for table in &config.tables {
        let pk_name = match &table.primary_key {
            PrimaryKeyConfig::Single(s) => s.clone(),
            PrimaryKeyConfig::Composite(v) => v[0].clone(),
        };

        let mut columns = Vec::with_capacity(table.columns.len());
        let mut primary_key_index = 0;
        for (index, c) in table.columns.iter().enumerate() {
            let kind = column_type(&table.name, c)?;
            let default = match &c.default {
                Some(d) => Some(column_default(&table.name, c, kind, d)?),
                None => None,
            };
            let is_primary_key = c.name == pk_name;
            if is_primary_key {
                primary_key_index = index;
            }
            columns.push(ColumnDescriptor {
                index,
                name: c.name.clone(),
                comment: c.comment.clone().unwrap_or_default(),
                nullable: c.nullable,
                database_type_name: kind.database_type_name(),
                database_type_pretty: kind.database_type_pretty(),
                is_primary_key,
                is_auto_increment: c.auto_increment,
                column_length: kind.length(),
                json_field_name: c.json_name.clone().unwrap_or_else(|| c.name.clone()),
                kind,
                default,
            });
        }

        let json_names: HashMap<&str, &str> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.json_field_name.as_str()))
            .collect();
        let validation = table
            .validation
            .iter()
            .filter_map(|(col, rule)| json_names.get(col.as_str()).map(|j| (j.to_string(), rule.clone())))
            .collect();

        out.push(ResourceDescriptor {
            name: table.name.clone(),
            columns,
            primary_key_index,
            validation,
        });
    }
    Ok(out)
}

fn column_type(table: &str, col: &ColumnConfig) -> Result<ColumnType, ConfigError> {
    let unknown = || ConfigError::UnknownColumnType {
        table: table.to_string(),
        column: col.name.clone(),
        type_name: col.type_.name().to_string(),
    };
    Ok(match col.type_.base_name().as_str() {
        "int" | "integer" => ColumnType::Int,
        "bigint" => ColumnType::BigInt,
        "varchar" => ColumnType::Varchar(col.type_.length().ok_or_else(unknown)?),
        "text" | "longtext" => ColumnType::Text,
        "datetime" | "timestamp" | "timestamptz" => ColumnType::DateTime,
        _ => return Err(unknown()),
    })
}

fn column_default(
    table: &str,
    col: &ColumnConfig,
    kind: ColumnType,
    default: &ColumnDefaultConfig,
) -> Result<ColumnDefault, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDefault {
        table: table.to_string(),
        column: col.name.clone(),
        reason: reason.to_string(),
    };
    match default {
        ColumnDefaultConfig::Expression { expression } => {
            let e = expression.trim().to_uppercase();
            if (e == "CURRENT_TIMESTAMP" || e == "NOW()") && kind == ColumnType::DateTime {
                Ok(ColumnDefault::CurrentTimestamp)
            } else {
                Err(invalid(&format!("unsupported expression {}", expression)))
            }
        }
        ColumnDefaultConfig::Literal(s) => match kind {
            ColumnType::Int => s
                .parse::<i32>()
                .map(|n| ColumnDefault::Value(Value::from(n)))
                .map_err(|_| invalid("not an int")),
            ColumnType::BigInt => s
                .parse::<i64>()
                .map(|n| ColumnDefault::Value(Value::from(n)))
                .map_err(|_| invalid("not a bigint")),
            ColumnType::Varchar(n) if s.chars().count() > n as usize => Err(invalid("longer than column")),
            ColumnType::Varchar(_) | ColumnType::Text => Ok(ColumnDefault::Value(Value::String(s.clone()))),
            ColumnType::DateTime if s.eq_ignore_ascii_case("CURRENT_TIMESTAMP") => Ok(ColumnDefault::CurrentTimestamp),
            ColumnType::DateTime => crate::record::parse_datetime(s)
                .map(|d| ColumnDefault::Value(Value::String(crate::record::format_datetime(&d))))
                .ok_or_else(|| invalid("not an RFC 3339 datetime")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_seven_tables() {
        let descriptors = resolve(&builtin().unwrap()).unwrap();
        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["admin", "events", "news", "phds", "projects", "resources", "staffs"]);
        for d in &descriptors {
            let pk = d.primary_key();
            assert_eq!(pk.name, "id");
            assert!(pk.is_auto_increment);
            assert_eq!(pk.kind, ColumnType::Int);
        }
    }

    #[test]
    fn events_keeps_declared_column_order_and_defaults() {
        let descriptors = resolve(&builtin().unwrap()).unwrap();
        let events = descriptors.iter().find(|d| d.name == "events").unwrap();
        assert_eq!(events.columns[0].name, "cover");
        assert_eq!(events.primary_key().index, 6);
        let event_time = events.column("event_time").unwrap();
        assert_eq!(event_time.kind, ColumnType::BigInt);
        assert_eq!(event_time.default, Some(ColumnDefault::Value(Value::from(0))));
        let create_time = events.column("create_time").unwrap();
        assert_eq!(create_time.default, Some(ColumnDefault::CurrentTimestamp));
    }

    #[test]
    fn admin_credentials_are_nullable() {
        let descriptors = resolve(&builtin().unwrap()).unwrap();
        let admin = descriptors.iter().find(|d| d.name == "admin").unwrap();
        assert!(admin.column("username").unwrap().nullable);
        assert_eq!(admin.column("password").unwrap().database_type_pretty, "varchar(256)");
    }

    #[test]
    fn rejects_composite_and_non_integer_keys() {
        let doc = r#"{"tables":[{"name":"t","primary_key":["a","b"],"columns":[
            {"name":"a","type":"int","nullable":false,"auto_increment":true},
            {"name":"b","type":"int","nullable":false}]}]}"#;
        let config: FullConfig = serde_json::from_str(doc).unwrap();
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidPrimaryKey { .. })));

        let doc = r#"{"tables":[{"name":"t","primary_key":"a","columns":[
            {"name":"a","type":"text","nullable":false,"auto_increment":true}]}]}"#;
        let config: FullConfig = serde_json::from_str(doc).unwrap();
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn rejects_unknown_types_and_bad_defaults() {
        let doc = r#"{"tables":[{"name":"t","primary_key":"id","columns":[
            {"name":"id","type":"int","nullable":false,"auto_increment":true},
            {"name":"blob","type":"bytea"}]}]}"#;
        let config: FullConfig = serde_json::from_str(doc).unwrap();
        assert!(matches!(resolve(&config), Err(ConfigError::UnknownColumnType { .. })));

        let doc = r#"{"tables":[{"name":"t","primary_key":"id","columns":[
            {"name":"id","type":"int","nullable":false,"auto_increment":true},
            {"name":"n","type":"bigint","default":"zero"}]}]}"#;
        let config: FullConfig = serde_json::from_str(doc).unwrap();
        assert!(matches!(resolve(&config), Err(ConfigError::InvalidDefault { .. })));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let table = r#"{"name":"t","primary_key":"id","columns":[{"name":"id","type":"int","nullable":false,"auto_increment":true}]}"#;
        let doc = format!(r#"{{"tables":[{},{}]}}"#, table, table);
        let config: FullConfig = serde_json::from_str(&doc).unwrap();
        assert!(matches!(resolve(&config), Err(ConfigError::DuplicateTable(_))));
    }

    #[test]
    fn varchar_length_accepts_both_spellings() {
        let a: ColumnTypeConfig = serde_json::from_str(r#""varchar(128)""#).unwrap();
        let b: ColumnTypeConfig = serde_json::from_str(r#"{"name":"varchar","params":[128]}"#).unwrap();
        assert_eq!(a.length(), Some(128));
        assert_eq!(b.length(), Some(128));
        assert_eq!(a.base_name(), "varchar");
    }
}
