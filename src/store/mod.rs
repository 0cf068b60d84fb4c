//! Record stores: the persistence seam under the resource engine.

mod memory;
mod order;
mod postgres;

pub use memory::MemoryStore;
pub use order::{parse_order, Direction, OrderError, OrderTerm};
pub use postgres::{ensure_database_exists, ensure_tables, PgStore};

use crate::config::ResourceDescriptor;
use crate::record::{PageWindow, Record};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid value: {0}")]
    Invalid(String),
    #[error("store: {0}")]
    Backend(String),
}

/// Row persistence for any resource. Implementations are shared across request tasks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn count(&self, desc: &ResourceDescriptor) -> Result<i64, StoreError>;

    /// Rows in `order` (primary key ascending when empty) within `window`.
    async fn find_page(
        &self,
        desc: &ResourceDescriptor,
        window: PageWindow,
        order: &[OrderTerm],
    ) -> Result<Vec<Record>, StoreError>;

    async fn find_by_id(&self, desc: &ResourceDescriptor, id: i32) -> Result<Option<Record>, StoreError>;

    /// First row (by primary key) whose `column` equals `value`.
    async fn find_by_field(
        &self,
        desc: &ResourceDescriptor,
        column: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError>;

    /// Insert a fully populated record; returns it with the assigned primary key.
    async fn insert(&self, desc: &ResourceDescriptor, record: &Record) -> Result<Record, StoreError>;

    /// Overwrite every data column of row `id`. Returns the stored row and rows affected.
    async fn save(
        &self,
        desc: &ResourceDescriptor,
        id: i32,
        record: &Record,
    ) -> Result<(Record, u64), StoreError>;

    async fn delete(&self, desc: &ResourceDescriptor, id: i32) -> Result<u64, StoreError>;
}
