//! Builds parameterized COUNT, SELECT, INSERT, UPDATE, DELETE and bootstrap DDL from a descriptor.

use super::params::BindValue;
use crate::config::{ColumnDefault, ResourceDescriptor};
use crate::record::{PageWindow, Record};
use crate::store::{Direction, OrderTerm, StoreError};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn select_column_list(desc: &ResourceDescriptor) -> String {
    desc.columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn count(schema: &str, desc: &ResourceDescriptor) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", qualified_table(schema, &desc.name));
    q
}

/// SELECT a page. The primary key is always the last sort key so pages are stable.
pub fn select_page(schema: &str, desc: &ResourceDescriptor, window: PageWindow, order: &[OrderTerm]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = &desc.primary_key().name;
    let mut keys: Vec<String> = order
        .iter()
        .map(|o| {
            let dir = match o.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            format!("{} {}", quoted(&o.column), dir)
        })
        .collect();
    if !order.iter().any(|o| &o.column == pk) {
        keys.push(format!("{} ASC", quoted(pk)));
    }
    let limit = q.push_param(BindValue::BigInt(Some(window.limit)));
    let offset = q.push_param(BindValue::BigInt(Some(window.offset)));
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT ${} OFFSET ${}",
        select_column_list(desc),
        qualified_table(schema, &desc.name),
        keys.join(", "),
        limit,
        offset
    );
    q
}

pub fn select_by_id(schema: &str, desc: &ResourceDescriptor, id: i32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::Int(Some(id)));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(desc),
        qualified_table(schema, &desc.name),
        quoted(&desc.primary_key().name),
        n
    );
    q
}

/// First row where `column = value`, lowest primary key first.
pub fn select_by_field(
    schema: &str,
    desc: &ResourceDescriptor,
    column: &str,
    value: &Value,
) -> Result<QueryBuf, StoreError> {
    let col = desc
        .column(column)
        .ok_or_else(|| StoreError::Invalid(format!("unknown column {}", column)))?;
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::from_json(col.kind, value)?);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${} ORDER BY {} LIMIT 1",
        select_column_list(desc),
        qualified_table(schema, &desc.name),
        quoted(&col.name),
        n,
        quoted(&desc.primary_key().name)
    );
    Ok(q)
}

/// INSERT every data column present in `record`; the primary key only when the
/// record carries a positive one.
pub fn insert(schema: &str, desc: &ResourceDescriptor, record: &Record) -> Result<QueryBuf, StoreError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &desc.columns {
        let v = if c.is_primary_key {
            match record.id(desc).filter(|id| *id > 0) {
                Some(id) => Value::from(id),
                None => continue,
            }
        } else {
            match record.get(&c.json_field_name) {
                Some(v) => v.clone(),
                None => continue,
            }
        };
        let n = q.push_param(BindValue::from_json(c.kind, &v)?);
        cols.push(quoted(&c.name));
        placeholders.push(format!("${}", n));
    }
    let table = qualified_table(schema, &desc.name);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, select_column_list(desc))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(desc)
        )
    };
    Ok(q)
}

/// UPDATE by id: SET every data column present in `record`.
pub fn update(schema: &str, desc: &ResourceDescriptor, id: i32, record: &Record) -> Result<QueryBuf, StoreError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in desc.data_columns() {
        let Some(v) = record.get(&c.json_field_name) else { continue };
        let n = q.push_param(BindValue::from_json(c.kind, v)?);
        sets.push(format!("{} = ${}", quoted(&c.name), n));
    }
    let table = qualified_table(schema, &desc.name);
    let pk = quoted(&desc.primary_key().name);
    let id_param = q.push_param(BindValue::Int(Some(id)));
    q.sql = if sets.is_empty() {
        format!("SELECT {} FROM {} WHERE {} = ${}", select_column_list(desc), table, pk, id_param)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            table,
            sets.join(", "),
            pk,
            id_param,
            select_column_list(desc)
        )
    };
    Ok(q)
}

pub fn delete(schema: &str, desc: &ResourceDescriptor, id: i32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::Int(Some(id)));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        qualified_table(schema, &desc.name),
        quoted(&desc.primary_key().name),
        n
    );
    q
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

/// CREATE TABLE IF NOT EXISTS with column types, NOT NULL and defaults. Existing tables are left alone.
pub fn create_table(schema: &str, desc: &ResourceDescriptor) -> String {
    let mut defs = Vec::with_capacity(desc.columns.len());
    for c in &desc.columns {
        if c.is_primary_key {
            defs.push(format!(
                "{} {} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
                quoted(&c.name),
                c.kind.pg_type()
            ));
            continue;
        }
        let mut def = format!("{} {}", quoted(&c.name), c.kind.pg_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        match &c.default {
            Some(ColumnDefault::CurrentTimestamp) => def.push_str(" DEFAULT NOW()"),
            Some(ColumnDefault::Value(Value::String(s))) => {
                def.push_str(" DEFAULT ");
                def.push_str(&literal(s));
            }
            Some(ColumnDefault::Value(v)) => {
                def.push_str(" DEFAULT ");
                def.push_str(&v.to_string());
            }
            None => {}
        }
        defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        qualified_table(schema, &desc.name),
        defs.join(",\n    ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin, resolve};
    use crate::record::decode;
    use crate::store::parse_order;

    fn descriptor(name: &str) -> ResourceDescriptor {
        resolve(&builtin().unwrap())
            .unwrap()
            .into_iter()
            .find(|d| d.name == name)
            .unwrap()
    }

    #[test]
    fn select_page_appends_primary_key_tiebreak() {
        let news = descriptor("news");
        let order = parse_order(&news, "create_time desc").unwrap();
        let q = select_page("public", &news, PageWindow::new(2, 10).unwrap(), &order);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"title\", \"content\", \"create_time\", \"update_time\", \"tags\", \"cover\" \
             FROM \"public\".\"news\" ORDER BY \"create_time\" DESC, \"id\" ASC LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.params, vec![BindValue::BigInt(Some(10)), BindValue::BigInt(Some(10))]);
    }

    #[test]
    fn insert_skips_absent_primary_key() {
        let projects = descriptor("projects");
        let r = decode(&projects, br#"{"name":"n","intro":"i"}"#).unwrap();
        let q = insert("public", &projects, &r).unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"projects\" (\"name\", \"intro\") VALUES ($1, $2) RETURNING \"id\", \"name\", \"intro\""
        );

        let r = decode(&projects, br#"{"id":5,"name":"n"}"#).unwrap();
        let q = insert("public", &projects, &r).unwrap();
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"projects\" (\"id\", \"name\")"));
        assert_eq!(q.params[0], BindValue::Int(Some(5)));
    }

    #[test]
    fn update_never_sets_primary_key() {
        let projects = descriptor("projects");
        let r = decode(&projects, br#"{"id":9,"name":"n"}"#).unwrap();
        let q = update("s", &projects, 3, &r).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"s\".\"projects\" SET \"name\" = $1 WHERE \"id\" = $2 RETURNING \"id\", \"name\", \"intro\""
        );
        assert_eq!(q.params[1], BindValue::Int(Some(3)));
    }

    #[test]
    fn select_by_field_orders_by_primary_key() {
        let admin = descriptor("admin");
        let q = select_by_field("public", &admin, "username", &Value::from("root")).unwrap();
        assert!(q.sql.ends_with("WHERE \"username\" = $1 ORDER BY \"id\" LIMIT 1"));
        assert!(select_by_field("public", &admin, "nope", &Value::Null).is_err());
    }

    #[test]
    fn create_table_carries_defaults() {
        let events = descriptor("events");
        let ddl = create_table("public", &events);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"events\""));
        assert!(ddl.contains("\"cover\" VARCHAR(512) NOT NULL DEFAULT ''"));
        assert!(ddl.contains("\"create_time\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(ddl.contains("\"event_time\" BIGINT NOT NULL DEFAULT 0"));
        assert!(ddl.contains("\"id\" INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
        assert!(ddl.contains("\"content\" TEXT NOT NULL,"));
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
        assert_eq!(literal("it's"), "'it''s'");
    }
}
