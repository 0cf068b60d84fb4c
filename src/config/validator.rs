//! Config validation: one integer auto-increment primary key per table, unique names.

use crate::config::{FullConfig, PrimaryKeyConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.tables.is_empty() {
        return Err(ConfigError::Validation("at least one table required".into()));
    }

    let mut table_names = HashSet::new();
    for t in &config.tables {
        if !table_names.insert(t.name.as_str()) {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
        if t.columns.is_empty() {
            return Err(ConfigError::Validation(format!("table {} has no columns", t.name)));
        }

        let mut column_names = HashSet::new();
        for c in &t.columns {
            if !column_names.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    table: t.name.clone(),
                    column: c.name.clone(),
                });
            }
        }

        let pk = match &t.primary_key {
            PrimaryKeyConfig::Single(s) => s.as_str(),
            PrimaryKeyConfig::Composite(v) if v.len() == 1 => v[0].as_str(),
            PrimaryKeyConfig::Composite(v) => {
                return Err(ConfigError::InvalidPrimaryKey {
                    table: t.name.clone(),
                    column: v.join(","),
                })
            }
        };
        let pk_col = t
            .columns
            .iter()
            .find(|c| c.name == pk)
            .ok_or_else(|| ConfigError::InvalidPrimaryKey {
                table: t.name.clone(),
                column: pk.to_string(),
            })?;
        if pk_col.type_.base_name() != "int" || !pk_col.auto_increment || pk_col.nullable {
            return Err(ConfigError::InvalidPrimaryKey {
                table: t.name.clone(),
                column: pk.to_string(),
            });
        }

        for col in t.validation.keys() {
            if !column_names.contains(col.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", t.name, col),
                });
            }
        }
    }

    Ok(())
}
