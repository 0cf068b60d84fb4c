//! Schema catalog: every resource, its endpoint URLs and column metadata. Immutable once built.

use crate::config::ResourceDescriptor;
use crate::error::{AppError, ConfigError};
use crate::service::{NoopHooks, RecordHooks, RuleHooks};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Endpoint URLs for one resource, relative to the API prefix.
#[derive(Clone, Debug, Serialize)]
pub struct CrudApi {
    pub name: String,
    pub create_url: String,
    pub retrieve_one_url: String,
    pub retrieve_many_url: String,
    pub update_url: String,
    pub delete_url: String,
    pub fetch_ddl_url: String,
    pub table_info: Arc<ResourceDescriptor>,
}

impl CrudApi {
    fn new(descriptor: Arc<ResourceDescriptor>) -> Self {
        let base = format!("/{}", descriptor.name);
        CrudApi {
            name: descriptor.name.clone(),
            create_url: base.clone(),
            retrieve_one_url: base.clone(),
            retrieve_many_url: base.clone(),
            update_url: base.clone(),
            delete_url: base,
            fetch_ddl_url: format!("/ddl/{}", descriptor.name),
            table_info: descriptor,
        }
    }
}

pub struct CatalogEntry {
    pub api: CrudApi,
    pub descriptor: Arc<ResourceDescriptor>,
    pub hooks: Arc<dyn RecordHooks>,
}

pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Tables that declare validation rules get `RuleHooks`, the rest `NoopHooks`.
    pub fn build(descriptors: Vec<ResourceDescriptor>) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();
        for d in descriptors {
            let hooks: Arc<dyn RecordHooks> = if d.validation.is_empty() {
                Arc::new(NoopHooks)
            } else {
                Arc::new(RuleHooks::new(d.validation.clone())?)
            };
            let descriptor = Arc::new(d);
            let entry = CatalogEntry {
                api: CrudApi::new(descriptor.clone()),
                descriptor,
                hooks,
            };
            entries.insert(entry.api.name.clone(), entry);
        }
        Ok(Catalog { entries })
    }

    /// Replace the hooks of one resource before the catalog is shared.
    pub fn with_hooks(mut self, name: &str, hooks: Arc<dyn RecordHooks>) -> Result<Self, AppError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| AppError::UnknownTable(name.to_string()))?;
        entry.hooks = hooks;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&CatalogEntry, AppError> {
        self.entries
            .get(name)
            .ok_or_else(|| AppError::UnknownTable(name.to_string()))
    }

    /// Name to endpoint descriptor, sorted by name.
    pub fn list_all(&self) -> BTreeMap<&str, &CrudApi> {
        self.entries.iter().map(|(k, e)| (k.as_str(), &e.api)).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
