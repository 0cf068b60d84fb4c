//! Process-local store: one ordered map per table, with auto-increment counters.

use super::{Direction, OrderTerm, RecordStore, StoreError};
use crate::config::ResourceDescriptor;
use crate::record::{PageWindow, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

struct Table {
    rows: BTreeMap<i32, Record>,
    /// `None` once a key of `i32::MAX` has been used.
    next_id: Option<i32>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, desc: &ResourceDescriptor, f: impl FnOnce(Option<&Table>) -> T) -> Result<T, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(f(tables.get(&desc.name)))
    }

    fn write<T>(&self, desc: &ResourceDescriptor, f: impl FnOnce(&mut Table) -> T) -> Result<T, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry(desc.name.clone()).or_insert_with(|| Table {
            rows: BTreeMap::new(),
            next_id: Some(1),
        });
        Ok(f(table))
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count(&self, desc: &ResourceDescriptor) -> Result<i64, StoreError> {
        self.read(desc, |t| t.map(|t| t.rows.len() as i64).unwrap_or(0))
    }

    async fn find_page(
        &self,
        desc: &ResourceDescriptor,
        window: PageWindow,
        order: &[OrderTerm],
    ) -> Result<Vec<Record>, StoreError> {
        self.read(desc, |t| {
            let Some(t) = t else { return Vec::new() };
            // BTreeMap iteration is already primary key order.
            let mut rows: Vec<&Record> = t.rows.values().collect();
            if !order.is_empty() {
                let fields: Vec<(&str, Direction)> = order
                    .iter()
                    .filter_map(|o| desc.column(&o.column).map(|c| (c.json_field_name.as_str(), o.direction)))
                    .collect();
                rows.sort_by(|a, b| {
                    for (field, dir) in &fields {
                        let ord = compare(a.get(field), b.get(field));
                        let ord = if *dir == Direction::Desc { ord.reverse() } else { ord };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    Ordering::Equal
                });
            }
            rows.into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(0))
                .cloned()
                .collect()
        })
    }

    async fn find_by_id(&self, desc: &ResourceDescriptor, id: i32) -> Result<Option<Record>, StoreError> {
        self.read(desc, |t| t.and_then(|t| t.rows.get(&id).cloned()))
    }

    async fn find_by_field(
        &self,
        desc: &ResourceDescriptor,
        column: &str,
        value: &Value,
    ) -> Result<Option<Record>, StoreError> {
        let field = desc
            .column(column)
            .ok_or_else(|| StoreError::Invalid(format!("unknown column {}", column)))?
            .json_field_name
            .clone();
        self.read(desc, |t| {
            t.and_then(|t| t.rows.values().find(|r| r.get(&field) == Some(value)).cloned())
        })
    }

    async fn insert(&self, desc: &ResourceDescriptor, record: &Record) -> Result<Record, StoreError> {
        let pk = desc.primary_key().json_field_name.clone();
        self.write(desc, |t| {
            let id = match record.id(desc).filter(|id| *id > 0) {
                Some(id) => id,
                None => t
                    .next_id
                    .ok_or_else(|| StoreError::Conflict(format!("{} id sequence exhausted", desc.name)))?,
            };
            if t.rows.contains_key(&id) {
                return Err(StoreError::Conflict(format!("duplicate primary key {}", id)));
            }
            if t.next_id.is_some_and(|n| n <= id) {
                t.next_id = id.checked_add(1);
            }
            let mut row = record.clone();
            row.insert(pk, Value::from(id));
            t.rows.insert(id, row.clone());
            Ok(row)
        })?
    }

    async fn save(
        &self,
        desc: &ResourceDescriptor,
        id: i32,
        record: &Record,
    ) -> Result<(Record, u64), StoreError> {
        let pk = desc.primary_key().json_field_name.clone();
        self.write(desc, |t| {
            let row = t
                .rows
                .get_mut(&id)
                .ok_or_else(|| StoreError::Backend(format!("row {} not found", id)))?;
            for col in desc.data_columns() {
                if let Some(v) = record.get(&col.json_field_name) {
                    row.insert(col.json_field_name.clone(), v.clone());
                }
            }
            row.insert(pk, Value::from(id));
            Ok((row.clone(), 1))
        })?
    }

    async fn delete(&self, desc: &ResourceDescriptor, id: i32) -> Result<u64, StoreError> {
        self.write(desc, |t| u64::from(t.rows.remove(&id).is_some()))
    }
}

/// Null sorts first; numbers numerically; everything else by its JSON text.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin, resolve};
    use crate::record::decode;

    fn projects() -> ResourceDescriptor {
        resolve(&builtin().unwrap())
            .unwrap()
            .into_iter()
            .find(|d| d.name == "projects")
            .unwrap()
    }

    fn body(json: &str) -> Record {
        decode(&projects(), json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let desc = projects();
        let a = store.insert(&desc, &body(r#"{"name":"a","intro":""}"#)).await.unwrap();
        let b = store.insert(&desc, &body(r#"{"name":"b","intro":""}"#)).await.unwrap();
        assert_eq!(a.id(&desc), Some(1));
        assert_eq!(b.id(&desc), Some(2));
        assert_eq!(store.count(&desc).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn explicit_ids_are_kept_and_conflict_on_reuse() {
        let store = MemoryStore::new();
        let desc = projects();
        let r = store.insert(&desc, &body(r#"{"id":10,"name":"x"}"#)).await.unwrap();
        assert_eq!(r.id(&desc), Some(10));
        let next = store.insert(&desc, &body(r#"{"name":"y"}"#)).await.unwrap();
        assert_eq!(next.id(&desc), Some(11));
        let dup = store.insert(&desc, &body(r#"{"id":10,"name":"z"}"#)).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn largest_key_exhausts_the_sequence() {
        let store = MemoryStore::new();
        let desc = projects();
        store.insert(&desc, &body(r#"{"id":2147483647,"name":"first"}"#)).await.unwrap();
        let next = store.insert(&desc, &body(r#"{"name":"second"}"#)).await;
        assert!(matches!(next, Err(StoreError::Conflict(_))));
        assert_eq!(store.count(&desc).await.unwrap(), 1);
        let kept = store.find_by_id(&desc, i32::MAX).await.unwrap().unwrap();
        assert_eq!(kept.get("name"), Some(&Value::from("first")));

        let low = store.insert(&desc, &body(r#"{"id":5,"name":"low"}"#)).await.unwrap();
        assert_eq!(low.id(&desc), Some(5));
    }

    #[tokio::test]
    async fn find_page_orders_and_windows() {
        let store = MemoryStore::new();
        let desc = projects();
        for name in ["c", "a", "b"] {
            store.insert(&desc, &body(&format!(r#"{{"name":"{}"}}"#, name))).await.unwrap();
        }
        let order = super::super::parse_order(&desc, "name desc").unwrap();
        let page = store
            .find_page(&desc, PageWindow::new(1, 2).unwrap(), &order)
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|r| r.get("name").cloned().unwrap()).collect();
        assert_eq!(names, [Value::from("c"), Value::from("b")]);

        let natural = store
            .find_page(&desc, PageWindow::new(2, 2).unwrap(), &[])
            .await
            .unwrap();
        assert_eq!(natural.len(), 1);
        assert_eq!(natural[0].id(&desc), Some(3));
    }

    #[tokio::test]
    async fn save_and_delete_report_rows() {
        let store = MemoryStore::new();
        let desc = projects();
        let r = store.insert(&desc, &body(r#"{"name":"a","intro":"i"}"#)).await.unwrap();
        let (saved, n) = store.save(&desc, 1, &body(r#"{"name":"b"}"#)).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(saved.get("name"), Some(&Value::from("b")));
        assert_eq!(saved.get("intro"), r.get("intro"));
        assert!(store.save(&desc, 99, &r).await.is_err());
        assert_eq!(store.delete(&desc, 1).await.unwrap(), 1);
        assert_eq!(store.delete(&desc, 1).await.unwrap(), 0);
        assert!(store.find_by_id(&desc, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_field_returns_lowest_id() {
        let store = MemoryStore::new();
        let desc = projects();
        store.insert(&desc, &body(r#"{"name":"dup","intro":"first"}"#)).await.unwrap();
        store.insert(&desc, &body(r#"{"name":"dup","intro":"second"}"#)).await.unwrap();
        let hit = store
            .find_by_field(&desc, "name", &Value::from("dup"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.get("intro"), Some(&Value::from("first")));
        assert!(store.find_by_field(&desc, "nope", &Value::Null).await.is_err());
    }
}
