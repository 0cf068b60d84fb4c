//! Generic CRUD over any resource: maps store results onto the request error taxonomy.

use crate::catalog::CatalogEntry;
use crate::error::AppError;
use crate::record::{fill_defaults, ListParams, Record};
use crate::store::{parse_order, RecordStore};
use serde_json::Value;

/// Borrowed view of one resource and the store it lives in.
pub struct ResourceAccessor<'a> {
    store: &'a dyn RecordStore,
    entry: &'a CatalogEntry,
}

impl<'a> ResourceAccessor<'a> {
    pub fn new(store: &'a dyn RecordStore, entry: &'a CatalogEntry) -> Self {
        ResourceAccessor { store, entry }
    }

    fn table(&self) -> &str {
        &self.entry.descriptor.name
    }

    /// One page plus the row count of the whole table. Invalid paging is rejected
    /// before the store is touched; any read failure is `NotFound`.
    pub async fn list_page(&self, params: &ListParams) -> Result<(Vec<Record>, i64), AppError> {
        let window = params.window()?;
        let desc = &self.entry.descriptor;
        let order = parse_order(desc, &params.order).map_err(|e| {
            tracing::warn!(table = %self.table(), error = %e, "order rejected");
            AppError::NotFound
        })?;
        let records = self.store.find_page(desc, window, &order).await.map_err(|e| {
            tracing::warn!(table = %self.table(), error = %e, "find page failed");
            AppError::NotFound
        })?;
        let total = self.store.count(desc).await.map_err(|e| {
            tracing::warn!(table = %self.table(), error = %e, "count failed");
            AppError::NotFound
        })?;
        Ok((records, total))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Record, AppError> {
        match self.store.find_by_id(&self.entry.descriptor, id).await {
            Ok(Some(r)) => Ok(r),
            Ok(None) => Err(AppError::NotFound),
            Err(e) => {
                tracing::warn!(table = %self.table(), id, error = %e, "find by id failed");
                Err(AppError::NotFound)
            }
        }
    }

    pub async fn find_by_field(&self, column: &str, value: &Value) -> Result<Record, AppError> {
        match self.store.find_by_field(&self.entry.descriptor, column, value).await {
            Ok(Some(r)) => Ok(r),
            Ok(None) => Err(AppError::NotFound),
            Err(e) => {
                tracing::warn!(table = %self.table(), column, error = %e, "find by field failed");
                Err(AppError::NotFound)
            }
        }
    }

    /// Insert `record` after filling absent columns with their defaults.
    pub async fn create(&self, mut record: Record) -> Result<Record, AppError> {
        fill_defaults(&self.entry.descriptor, &mut record, chrono::Utc::now());
        self.store.insert(&self.entry.descriptor, &record).await.map_err(|e| {
            tracing::warn!(table = %self.table(), error = %e, "insert failed");
            AppError::InsertFailed
        })
    }

    /// Load row `id`, copy the fields present in `patch` onto it, save. Last writer wins.
    pub async fn update(&self, id: i32, patch: &Record) -> Result<Record, AppError> {
        let desc = &self.entry.descriptor;
        let mut current = self.get_by_id(id).await?;
        current.merge(desc, patch);
        let (saved, _) = self.store.save(desc, id, &current).await.map_err(|e| {
            tracing::warn!(table = %self.table(), id, error = %e, "save failed");
            AppError::UpdateFailed
        })?;
        Ok(saved)
    }

    pub async fn delete(&self, id: i32) -> Result<u64, AppError> {
        self.get_by_id(id).await?;
        self.store.delete(&self.entry.descriptor, id).await.map_err(|e| {
            tracing::warn!(table = %self.table(), id, error = %e, "delete failed");
            AppError::DeleteFailed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::{builtin, resolve, ResourceDescriptor};
    use crate::record::{decode, PageWindow};
    use crate::store::{MemoryStore, OrderTerm, StoreError};
    use async_trait::async_trait;

    fn catalog() -> Catalog {
        Catalog::build(resolve(&builtin().unwrap()).unwrap()).unwrap()
    }

    fn params(page: i64, size: i64, order: &str) -> ListParams {
        ListParams {
            page,
            page_size: size,
            order: order.into(),
        }
    }

    /// Every call fails.
    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn count(&self, _: &ResourceDescriptor) -> Result<i64, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn find_page(&self, _: &ResourceDescriptor, _: PageWindow, _: &[OrderTerm]) -> Result<Vec<Record>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn find_by_id(&self, _: &ResourceDescriptor, _: i32) -> Result<Option<Record>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn find_by_field(&self, _: &ResourceDescriptor, _: &str, _: &Value) -> Result<Option<Record>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn insert(&self, _: &ResourceDescriptor, _: &Record) -> Result<Record, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn save(&self, _: &ResourceDescriptor, _: i32, _: &Record) -> Result<(Record, u64), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn delete(&self, _: &ResourceDescriptor, _: i32) -> Result<u64, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let catalog = catalog();
        let store = MemoryStore::new();
        let entry = catalog.get("news").unwrap();
        let news = ResourceAccessor::new(&store, entry);

        let body = decode(&entry.descriptor, br#"{"title":"A","content":"B","tags":"t","cover":"c"}"#).unwrap();
        let created = news.create(body).await.unwrap();
        let id = created.id(&entry.descriptor).unwrap();
        assert!(id > 0);
        assert!(created.get("create_time").and_then(Value::as_str).is_some());

        let patch = decode(&entry.descriptor, br#"{"title":"A2"}"#).unwrap();
        let updated = news.update(id, &patch).await.unwrap();
        assert_eq!(updated.get("title"), Some(&Value::from("A2")));
        assert_eq!(updated.get("content"), Some(&Value::from("B")));
        assert_eq!(updated.get("update_time"), created.get("update_time"));

        assert_eq!(news.delete(id).await.unwrap(), 1);
        assert!(matches!(news.get_by_id(id).await, Err(AppError::NotFound)));
        assert!(matches!(news.delete(id).await, Err(AppError::NotFound)));
        assert!(matches!(news.update(id, &patch).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn list_counts_the_whole_table() {
        let catalog = catalog();
        let store = MemoryStore::new();
        let entry = catalog.get("projects").unwrap();
        let projects = ResourceAccessor::new(&store, entry);
        for i in 0..5 {
            let body = decode(&entry.descriptor, format!(r#"{{"name":"p{}"}}"#, i).as_bytes()).unwrap();
            projects.create(body).await.unwrap();
        }
        let (rows, total) = projects.list_page(&params(2, 2, "")).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(&entry.descriptor), Some(3));

        assert!(matches!(projects.list_page(&params(1, 0, "")).await, Err(AppError::BadParams(_))));
        assert!(matches!(projects.list_page(&params(1, 2, "ghost")).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn store_failures_map_to_taxonomy() {
        let catalog = catalog();
        let entry = catalog.get("phds").unwrap();
        let phds = ResourceAccessor::new(&BrokenStore, entry);
        assert!(matches!(phds.list_page(&params(0, 5, "")).await, Err(AppError::NotFound)));
        assert!(matches!(phds.get_by_id(1).await, Err(AppError::NotFound)));
        assert!(matches!(phds.create(Record::new()).await, Err(AppError::InsertFailed)));
        assert!(matches!(
            phds.find_by_field("name", &Value::from("x")).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn bad_paging_never_reaches_the_store() {
        let catalog = catalog();
        let entry = catalog.get("staffs").unwrap();
        let staffs = ResourceAccessor::new(&BrokenStore, entry);
        let err = staffs.list_page(&params(0, -1, "")).await.unwrap_err();
        assert!(matches!(err, AppError::BadParams(_)));
    }
}
