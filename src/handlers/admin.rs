//! Admin login state. Always answers 200 with `{"isLogin": bool}`; never 401.

use super::Call;
use crate::response;
use crate::service::ResourceAccessor;
use crate::state::AppState;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use serde::Serialize;
use serde_json::{json, Value};

const ADMIN_TABLE: &str = "admin";

#[derive(Serialize)]
struct LoginState {
    #[serde(rename = "isLogin")]
    is_login: bool,
}

fn login_state(is_login: bool) -> Response {
    response::json(LoginState { is_login })
}

fn with_cookie(mut resp: Response, cookie: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(cookie) {
        resp.headers_mut().append(header::SET_COOKIE, v);
    }
    resp
}

pub fn is_admin_login(state: &AppState, call: &Call) -> Response {
    login_state(state.sessions.current(&call.head.headers).is_some())
}

/// Stored passwords are plain text and compared as such.
pub async fn admin_login(state: &AppState, call: &Call) -> Response {
    let username = call.query("username").unwrap_or_default();
    let password = call.query("password").unwrap_or_default();

    let Ok(entry) = state.catalog.get(ADMIN_TABLE) else {
        tracing::warn!("admin table is not configured");
        return login_state(false);
    };
    let admin = match ResourceAccessor::new(state.store.as_ref(), entry)
        .find_by_field("username", &Value::from(username))
        .await
    {
        Ok(admin) => admin,
        Err(_) => {
            tracing::info!(username, "login for unknown admin");
            return login_state(false);
        }
    };

    let matches = admin.get("password").and_then(Value::as_str) == Some(password);
    let Some(admin_id) = admin.id(&entry.descriptor).filter(|_| matches) else {
        tracing::info!(username, "admin login rejected");
        return login_state(false);
    };

    let id = state.sessions.start(admin_id);
    tracing::info!(admin_id, "admin logged in");
    with_cookie(login_state(true), &state.sessions.set_cookie(id))
}

pub fn admin_logout(state: &AppState, call: &Call) -> Response {
    state.sessions.end(&call.head.headers);
    with_cookie(response::json(json!({})), &state.sessions.clear_cookie())
}
