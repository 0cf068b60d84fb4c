//! Middleware-chain façade: an axum `Router` built from the route table, with tracing and CORS.

use super::table::RouteTable;
use crate::error::ConfigError;
use crate::handlers::{handle, Call};
use crate::openapi;
use crate::policy::RequestHead;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, MethodFilter, MethodRouter};
use axum::{Json, Router};
use std::collections::{BTreeMap, HashMap};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Routes of the table, grouped by path so each path gets one method router.
pub fn api_routes(state: AppState, table: &RouteTable) -> Result<Router, ConfigError> {
    let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
    for route in table.routes() {
        let filter = MethodFilter::try_from(route.method.clone()).map_err(|e| ConfigError::Setting {
            key: "routes",
            message: format!("{} {}: {}", route.method, route.path, e),
        })?;
        let state = state.clone();
        let endpoint = route.endpoint.clone();
        let handler = move |head: RequestHead, path: Option<Path<HashMap<String, String>>>, body: Bytes| {
            let state = state.clone();
            let endpoint = endpoint.clone();
            async move {
                let param = path.and_then(|Path(p)| p.into_values().next());
                handle(&state, &endpoint, Call::new(head, param, body)).await
            }
        };
        let methods = by_path.remove(route.path.as_str()).unwrap_or_else(MethodRouter::new);
        by_path.insert(route.path.as_str(), methods.on(filter, handler));
    }
    Ok(by_path
        .into_iter()
        .fold(Router::new(), |router, (path, methods)| router.route(path, methods)))
}

pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::Setting {
        key: "CORS_ORIGIN",
        message: e.to_string(),
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT, header::ORIGIN])
        .expose_headers([header::SET_COOKIE]))
}

/// Full application: the API under `prefix`, `/swagger/doc.json`, request tracing and CORS.
pub fn app(state: AppState, prefix: &str, cors_origin: &str) -> Result<Router, ConfigError> {
    let table = RouteTable::build(&state.catalog);
    let doc = openapi::document(&table, prefix);
    let api = api_routes(state, &table)?;

    let prefix = prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(prefix, api)
    };
    Ok(router
        .route(
            "/swagger/doc.json",
            get(move || {
                let doc = doc.clone();
                async move { Json(doc) }
            }),
        )
        .layer(RequestBodyLimitLayer::new(super::dispatch::BODY_LIMIT))
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_rejects_unusable_origin() {
        assert!(cors_layer("http://localhost:3000").is_ok());
        assert!(matches!(cors_layer("bad\norigin"), Err(ConfigError::Setting { key: "CORS_ORIGIN", .. })));
    }
}
