//! Extract the request head (method, URI, headers) for the request policy.

use crate::policy::RequestHead;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

#[async_trait]
impl<S> FromRequestParts<S> for RequestHead
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestHead::from_parts(parts))
    }
}

impl RequestHead {
    pub fn from_parts(parts: &Parts) -> Self {
        RequestHead {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}
