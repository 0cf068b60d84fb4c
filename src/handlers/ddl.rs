//! Schema discovery: the whole catalog, or one resource's endpoints and columns.

use super::Call;
use crate::error::AppError;
use crate::policy::Action;
use crate::response;
use crate::state::AppState;
use axum::response::Response;

const DDL: &str = "ddl";

pub fn list_catalog(state: &AppState, call: &Call) -> Result<Response, AppError> {
    state.policy.check(&call.head, DDL, Action::FetchDdl)?;
    Ok(response::json(state.catalog.list_all()))
}

pub fn describe(state: &AppState, call: &Call) -> Result<Response, AppError> {
    let name = call.param.as_deref().unwrap_or_default();
    state.policy.check(&call.head, DDL, Action::FetchDdl)?;
    let entry = state.catalog.get(name)?;
    Ok(response::json(&entry.api))
}
