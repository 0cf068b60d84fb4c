//! Injectable request policy: context initialization and request validation.

use crate::error::AppError;
use crate::session::SessionStore;
use axum::http::{HeaderMap, Method, Uri};
use serde::Serialize;
use std::sync::Arc;

/// Logical operation a request performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    RetrieveOne,
    RetrieveMany,
    Update,
    Delete,
    FetchDdl,
}

impl Action {
    pub fn is_write(self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }
}

/// Method, URI and headers of the inbound request.
#[derive(Clone, Debug)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub head: RequestHead,
}

pub trait ContextInitializer: Send + Sync {
    fn initialize(&self, head: &RequestHead) -> RequestContext;
}

/// Hands the inbound head through unchanged.
pub struct PassThrough;

impl ContextInitializer for PassThrough {
    fn initialize(&self, head: &RequestHead) -> RequestContext {
        RequestContext { head: head.clone() }
    }
}

pub trait RequestValidator: Send + Sync {
    fn validate(&self, ctx: &RequestContext, table: &str, action: Action) -> Result<(), AppError>;
}

pub struct AllowAll;

impl RequestValidator for AllowAll {
    fn validate(&self, _ctx: &RequestContext, _table: &str, _action: Action) -> Result<(), AppError> {
        Ok(())
    }
}

/// Writes require a live admin session.
pub struct AdminGuard {
    sessions: SessionStore,
}

impl AdminGuard {
    pub fn new(sessions: SessionStore) -> Self {
        AdminGuard { sessions }
    }
}

impl RequestValidator for AdminGuard {
    fn validate(&self, ctx: &RequestContext, table: &str, action: Action) -> Result<(), AppError> {
        if !action.is_write() || self.sessions.current(&ctx.head.headers).is_some() {
            return Ok(());
        }
        tracing::info!(table, ?action, "write without admin session rejected");
        Err(AppError::Unauthorized)
    }
}

#[derive(Clone)]
pub struct Policy {
    pub initializer: Arc<dyn ContextInitializer>,
    pub validator: Arc<dyn RequestValidator>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            initializer: Arc::new(PassThrough),
            validator: Arc::new(AllowAll),
        }
    }
}

impl Policy {
    pub fn with_validator(validator: Arc<dyn RequestValidator>) -> Self {
        Policy {
            validator,
            ..Default::default()
        }
    }

    /// Build the context and run the validator for one request.
    pub fn check(&self, head: &RequestHead, table: &str, action: Action) -> Result<RequestContext, AppError> {
        let ctx = self.initializer.initialize(head);
        self.validator.validate(&ctx, table, action)?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use std::time::Duration;

    fn head(cookie: Option<&str>) -> RequestHead {
        let mut headers = HeaderMap::new();
        if let Some(c) = cookie {
            headers.insert(header::COOKIE, c.parse().unwrap());
        }
        RequestHead {
            method: Method::POST,
            uri: Uri::from_static("/api/news"),
            headers,
        }
    }

    #[test]
    fn default_policy_allows_everything() {
        let p = Policy::default();
        for action in [Action::Create, Action::Delete, Action::FetchDdl] {
            assert!(p.check(&head(None), "news", action).is_ok());
        }
    }

    #[test]
    fn admin_guard_gates_writes_only() {
        let sessions = SessionStore::new(Duration::from_secs(60));
        let p = Policy::with_validator(Arc::new(AdminGuard::new(sessions.clone())));
        assert!(matches!(
            p.check(&head(None), "news", Action::Create),
            Err(AppError::Unauthorized)
        ));
        assert!(p.check(&head(None), "news", Action::RetrieveMany).is_ok());

        let id = sessions.start(1);
        let cookie = format!("session={}", id);
        assert!(p.check(&head(Some(&cookie)), "news", Action::Update).is_ok());
    }
}
