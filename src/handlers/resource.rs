//! The five CRUD handlers, identical for every resource.

use super::Call;
use crate::error::AppError;
use crate::policy::Action;
use crate::record::{decode, parse_id, ListParams};
use crate::response;
use crate::service::ResourceAccessor;
use crate::state::AppState;
use axum::response::Response;

fn id_param(call: &Call) -> Result<i32, AppError> {
    let raw = call.param.as_deref().ok_or_else(|| AppError::bad_params("missing id"))?;
    parse_id(raw)
}

pub async fn list(state: &AppState, name: &str, call: &Call) -> Result<Response, AppError> {
    let entry = state.catalog.get(name)?;
    let params = ListParams::from_query(&call.query)?;
    state.policy.check(&call.head, name, Action::RetrieveMany)?;
    let (records, total) = ResourceAccessor::new(state.store.as_ref(), entry)
        .list_page(&params)
        .await?;
    Ok(response::paged(params.page, params.page_size, records, total))
}

pub async fn read(state: &AppState, name: &str, call: &Call) -> Result<Response, AppError> {
    let entry = state.catalog.get(name)?;
    let id = id_param(call)?;
    state.policy.check(&call.head, name, Action::RetrieveOne)?;
    let record = ResourceAccessor::new(state.store.as_ref(), entry).get_by_id(id).await?;
    Ok(response::json(record))
}

pub async fn create(state: &AppState, name: &str, call: &Call) -> Result<Response, AppError> {
    let entry = state.catalog.get(name)?;
    let mut record = decode(&entry.descriptor, &call.body)?;
    entry.hooks.run(&mut record, Action::Create)?;
    state.policy.check(&call.head, name, Action::Create)?;
    let created = ResourceAccessor::new(state.store.as_ref(), entry).create(record).await?;
    Ok(response::json(created))
}

pub async fn update(state: &AppState, name: &str, call: &Call) -> Result<Response, AppError> {
    let entry = state.catalog.get(name)?;
    let id = id_param(call)?;
    let mut patch = decode(&entry.descriptor, &call.body)?;
    entry.hooks.run(&mut patch, Action::Update)?;
    state.policy.check(&call.head, name, Action::Update)?;
    let updated = ResourceAccessor::new(state.store.as_ref(), entry)
        .update(id, &patch)
        .await?;
    Ok(response::json(updated))
}

pub async fn delete(state: &AppState, name: &str, call: &Call) -> Result<Response, AppError> {
    let entry = state.catalog.get(name)?;
    let id = id_param(call)?;
    state.policy.check(&call.head, name, Action::Delete)?;
    let rows = ResourceAccessor::new(state.store.as_ref(), entry).delete(id).await?;
    Ok(response::rows_affected(rows))
}
