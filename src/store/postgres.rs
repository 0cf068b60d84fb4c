//! PostgreSQL store over a shared `PgPool`, plus start-up helpers for database and tables.

use super::{OrderTerm, RecordStore, StoreError};
use crate::config::{ColumnType, ResourceDescriptor};
use crate::record::{format_datetime, PageWindow, Record};
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    async fn fetch_optional(&self, desc: &ResourceDescriptor, q: QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| row_to_record(desc, &r)).transpose()
    }

    async fn fetch_all(&self, desc: &ResourceDescriptor, q: QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_record(desc, r)).collect()
    }

    async fn execute(&self, q: QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    /// Move the identity past the largest key after an insert with an explicit key.
    async fn sync_identity(&self, conn: &mut PgConnection, desc: &ResourceDescriptor) -> Result<(), StoreError> {
        let table = format!("{}.{}", sql::quoted(&self.schema), sql::quoted(&desc.name));
        let pk = sql::quoted(&desc.primary_key().name);
        let stmt = format!(
            "SELECT setval(pg_get_serial_sequence($1, $2), GREATEST((SELECT MAX({}) FROM {}), 1))",
            pk, table
        );
        tracing::debug!(sql = %stmt, "query");
        sqlx::query(&stmt)
            .bind(&table)
            .bind(&desc.primary_key().name)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn count(&self, desc: &ResourceDescriptor) -> Result<i64, StoreError> {
        let q = sql::count(&self.schema, desc);
        tracing::debug!(sql = %q.sql, "query");
        let (n,): (i64,) = sqlx::query_as(&q.sql).fetch_one(&self.pool).await?;
        Ok(n)
    }

    async fn find_page(
        &self,
        desc: &ResourceDescriptor,
        window: PageWindow,
        order: &[OrderTerm],
    ) -> Result<Vec<Record>, StoreError> {
        self.fetch_all(desc, sql::select_page(&self.schema, desc, window, order)).await
    }

    async fn find_by_id(&self, desc: &ResourceDescriptor, id: i32) -> Result<Option<Record>, StoreError> {
        self.fetch_optional(desc, sql::select_by_id(&self.schema, desc, id)).await
    }

    async fn find_by_field(
        &self,
        desc: &ResourceDescriptor,
        column: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError> {
        let q = sql::select_by_field(&self.schema, desc, column, value)?;
        self.fetch_optional(desc, q).await
    }

    /// The insert and the identity resync commit together.
    async fn insert(&self, desc: &ResourceDescriptor, record: &Record) -> Result<Record, StoreError> {
        let explicit_id = record.id(desc).is_some_and(|id| id > 0);
        let q = sql::insert(&self.schema, desc, record)?;
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = p.bind(query);
        }
        let row = query
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::Backend("insert returned no row".into()))?;
        let inserted = row_to_record(desc, &row)?;
        if explicit_id {
            self.sync_identity(&mut *tx, desc).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn save(
        &self,
        desc: &ResourceDescriptor,
        id: i32,
        record: &Record,
    ) -> Result<(Record, u64), StoreError> {
        let q = sql::update(&self.schema, desc, id, record)?;
        let row = self
            .fetch_optional(desc, q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))?;
        Ok((row, 1))
    }

    async fn delete(&self, desc: &ResourceDescriptor, id: i32) -> Result<u64, StoreError> {
        self.execute(sql::delete(&self.schema, desc, id)).await
    }
}

fn row_to_record(desc: &ResourceDescriptor, row: &PgRow) -> Result<Record, StoreError> {
    let mut record = Record::new();
    for c in &desc.columns {
        let name = c.name.as_str();
        let v = match c.kind {
            ColumnType::Int => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            ColumnType::BigInt => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            ColumnType::Varchar(_) | ColumnType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
            ColumnType::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(|t| Value::String(format_datetime(&t))),
        };
        record.insert(c.json_field_name.clone(), v.unwrap_or(Value::Null));
    }
    Ok(record)
}

/// Create the database named in `database_url` if it does not exist (connects to `postgres` to check).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = split_db_name(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Invalid(format!("DATABASE_URL: {}", e)))?;
    let mut conn = opts.connect().await?;
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn split_db_name(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Invalid("DATABASE_URL: no path".into()))?
        + 1;
    let rest = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match rest.split_once('?') {
        Some((name, q)) => (name.trim(), format!("?{}", q)),
        None => (rest.trim(), String::new()),
    };
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name.to_string()))
}

/// CREATE SCHEMA / CREATE TABLE IF NOT EXISTS for every resource. Never alters existing tables.
pub async fn ensure_tables(pool: &PgPool, schema: &str, descriptors: &[ResourceDescriptor]) -> Result<(), StoreError> {
    sqlx::query(&sql::create_schema(schema)).execute(pool).await?;
    for desc in descriptors {
        let ddl = sql::create_table(schema, desc);
        tracing::debug!(sql = %ddl, "ddl");
        sqlx::query(&ddl).execute(pool).await?;
    }
    tracing::info!(schema = %schema, tables = descriptors.len(), "tables ensured");
    Ok(())
}
