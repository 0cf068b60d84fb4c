//! HTTP handlers shared by both façades. Each takes the decoded pieces of a request.

pub mod admin;
pub mod contact;
pub mod ddl;
pub mod resource;

use crate::policy::RequestHead;
use crate::routes::Endpoint;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

/// A request after routing: head, the captured path segment, query pairs and raw body.
#[derive(Clone, Debug)]
pub struct Call {
    pub head: RequestHead,
    pub param: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl Call {
    /// Query pairs are taken from the head's URI; a malformed query string reads as empty.
    pub fn new(head: RequestHead, param: Option<String>, body: Bytes) -> Self {
        let query = Query::<HashMap<String, String>>::try_from_uri(&head.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        Call {
            head,
            param,
            query,
            body,
        }
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

pub async fn handle(state: &AppState, endpoint: &Endpoint, call: Call) -> Response {
    let result = match endpoint {
        Endpoint::List(name) => resource::list(state, name, &call).await,
        Endpoint::Read(name) => resource::read(state, name, &call).await,
        Endpoint::Create(name) => resource::create(state, name, &call).await,
        Endpoint::Update(name) => resource::update(state, name, &call).await,
        Endpoint::Delete(name) => resource::delete(state, name, &call).await,
        Endpoint::Catalog => ddl::list_catalog(state, &call),
        Endpoint::Describe => ddl::describe(state, &call),
        Endpoint::IsAdminLogin => Ok(admin::is_admin_login(state, &call)),
        Endpoint::AdminLogin => Ok(admin::admin_login(state, &call).await),
        Endpoint::AdminLogout => Ok(admin::admin_logout(state, &call)),
        Endpoint::NotifyContact => Ok(contact::notify_contact(state, &call).await),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}
