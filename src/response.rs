//! Response helpers: JSON bodies with `Cache-Control: no-cache`, paged envelope.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Envelope for list endpoints; `total_records` counts the whole table.
#[derive(Serialize, Debug)]
pub struct PagedResults<T> {
    pub page: i64,
    pub page_size: i64,
    pub data: Vec<T>,
    pub total_records: i64,
}

pub fn with_no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// 200 with a JSON body.
pub fn json<T: Serialize>(data: T) -> Response {
    json_status(StatusCode::OK, data)
}

pub fn json_status<T: Serialize>(status: StatusCode, data: T) -> Response {
    with_no_cache((status, Json(data)).into_response())
}

/// Delete answers with the bare affected-row count, e.g. `1`.
pub fn rows_affected(count: u64) -> Response {
    json(count)
}

pub fn paged<T: Serialize>(page: i64, page_size: i64, data: Vec<T>, total_records: i64) -> Response {
    json(PagedResults {
        page,
        page_size,
        data,
        total_records,
    })
}
