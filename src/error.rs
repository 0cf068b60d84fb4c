//! Typed errors and HTTP mapping.
//!
//! Every request failure is answered with HTTP 400 and `{code, message}`. Existing
//! clients only distinguish failures by message, so the status is deliberately flat;
//! splitting it into 404/409/500 is a compatibility break.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: table {table} column {column}")]
    InvalidPrimaryKey { table: String, column: String },
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate column: table {table} column {column}")]
    DuplicateColumn { table: String, column: String },
    #[error("unknown column type '{type_name}': table {table} column {column}")]
    UnknownColumnType {
        table: String,
        column: String,
        type_name: String,
    },
    #[error("invalid default for table {table} column {column}: {reason}")]
    InvalidDefault {
        table: String,
        column: String,
        reason: String,
    },
    #[error("setting {key}: {message}")]
    Setting { key: &'static str, message: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input, detected before the store is consulted.
    #[error("bad params error")]
    BadParams(String),
    /// No row, or the read itself failed. The two are not distinguished.
    #[error("record not found")]
    NotFound,
    #[error("db insert error")]
    InsertFailed,
    #[error("db update error")]
    UpdateFailed,
    #[error("db delete error")]
    DeleteFailed,
    #[error("unable to find table: {0}")]
    UnknownTable(String),
    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn bad_params(detail: impl Into<String>) -> Self {
        AppError::BadParams(detail.into())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::BadParams(detail) = &self {
            tracing::debug!(detail = %detail, "bad params");
        }
        let status = StatusCode::BAD_REQUEST;
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };
        crate::response::with_no_cache((status, Json(body)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_bad_request() {
        let errors = [
            AppError::bad_params("page"),
            AppError::NotFound,
            AppError::InsertFailed,
            AppError::UpdateFailed,
            AppError::DeleteFailed,
            AppError::UnknownTable("nope".into()),
            AppError::Unauthorized,
        ];
        for e in errors {
            assert_eq!(e.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn messages_hide_bad_params_detail() {
        assert_eq!(AppError::bad_params("pagesize <= 0").to_string(), "bad params error");
        assert_eq!(
            AppError::UnknownTable("unknownTable".into()).to_string(),
            "unable to find table: unknownTable"
        );
    }
}
