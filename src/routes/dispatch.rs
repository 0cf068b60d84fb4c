//! Direct dispatcher: matches the route table by path segments, no middleware.

use super::table::{RouteMatch, RouteTable};
use crate::handlers::{handle, Call};
use crate::policy::RequestHead;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;

/// Bodies larger than this are refused with 413.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct Dispatcher {
    state: AppState,
    table: Arc<RouteTable>,
    prefix: Arc<str>,
}

impl Dispatcher {
    pub fn new(state: AppState, prefix: &str) -> Self {
        let table = Arc::new(RouteTable::build(&state.catalog));
        Dispatcher {
            state,
            table,
            prefix: Arc::from(prefix.trim_end_matches('/')),
        }
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(&*self.prefix)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    pub async fn dispatch(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let Some(path) = self.strip_prefix(parts.uri.path()) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let (endpoint, param) = match self.table.match_route(&parts.method, path) {
            RouteMatch::Found { route, param } => (route.endpoint.clone(), param),
            RouteMatch::MethodNotAllowed { allow } => return method_not_allowed(&allow),
            RouteMatch::NotFound => return StatusCode::NOT_FOUND.into_response(),
        };
        let body = match axum::body::to_bytes(body, BODY_LIMIT).await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(error = %e, "request body rejected");
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        };
        tracing::debug!(method = %parts.method, path = %parts.uri.path(), ?endpoint, "dispatch");
        let call = Call::new(RequestHead::from_parts(&parts), param, body);
        let response = handle(&self.state, &endpoint, call).await;
        if parts.method == Method::HEAD {
            let (head, _) = response.into_parts();
            return Response::from_parts(head, Body::empty());
        }
        response
    }

    /// Serve every request through `dispatch`.
    pub fn into_router(self) -> Router {
        Router::new().fallback(move |req: Request| {
            let dispatcher = self.clone();
            async move { dispatcher.dispatch(req).await }
        })
    }
}

fn method_not_allowed(allow: &str) -> Response {
    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    if let Ok(v) = HeaderValue::from_str(allow) {
        response.headers_mut().insert(header::ALLOW, v);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::{builtin, resolve};
    use crate::store::MemoryStore;

    fn dispatcher(prefix: &str) -> Dispatcher {
        let catalog = Catalog::build(resolve(&builtin().unwrap()).unwrap()).unwrap();
        Dispatcher::new(AppState::new(catalog, Arc::new(MemoryStore::new())), prefix)
    }

    #[test]
    fn prefix_must_end_at_a_segment_boundary() {
        let d = dispatcher("/api");
        assert_eq!(d.strip_prefix("/api/news"), Some("/news"));
        assert_eq!(d.strip_prefix("/api"), Some(""));
        assert_eq!(d.strip_prefix("/apinews"), None);
        assert_eq!(d.strip_prefix("/news"), None);
        assert_eq!(dispatcher("/").strip_prefix("/news"), Some("/news"));
    }
}
