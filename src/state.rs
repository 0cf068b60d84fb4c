//! Shared application state for every route. Built once at start-up, cloned per request.

use crate::catalog::Catalog;
use crate::notify::{LogNotifier, Notifier};
use crate::policy::Policy;
use crate::session::SessionStore;
use crate::store::RecordStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn RecordStore>,
    pub policy: Policy,
    pub sessions: SessionStore,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Default policy, 12 hour sessions and a logging notifier.
    pub fn new(catalog: Catalog, store: Arc<dyn RecordStore>) -> Self {
        AppState {
            catalog: Arc::new(catalog),
            store,
            policy: Policy::default(),
            sessions: SessionStore::new(Duration::from_secs(12 * 60 * 60)),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
