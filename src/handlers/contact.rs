//! Contact form: forwards name, email and feedback to the site's inbox.

use super::Call;
use crate::notify::ContactMessage;
use crate::response;
use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

pub async fn notify_contact(state: &AppState, call: &Call) -> Response {
    let field = |key: &str| call.query(key).filter(|v| !v.is_empty()).map(str::to_string);
    let (Some(name), Some(email), Some(feedback)) = (field("name"), field("email"), field("feedback")) else {
        return response::json_status(StatusCode::BAD_REQUEST, json!({ "message": "invalid request" }));
    };

    let message = ContactMessage { name, email, feedback };
    match state.notifier.notify_contact(&message).await {
        Ok(()) => response::json(json!({})),
        Err(e) => {
            tracing::warn!(error = %e, "contact notification failed");
            response::json_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": format!("failed to send email,err{}", e) }),
            )
        }
    }
}
