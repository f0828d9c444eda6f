pub mod departments;
pub mod incidents;
pub mod metrics;
pub mod notifications;
pub mod pagination;
pub mod rules;
pub mod services;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use quos_storage::StorageError;

use crate::state::AppState;

/// Error envelope: `{"error": "<code>", "message": "..."}`.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Success envelope: `{"data": ...}`.
#[derive(Serialize)]
pub struct DataBody<T: Serialize> {
    pub data: T,
}

/// Paginated success envelope.
#[derive(Serialize)]
pub struct PaginatedBody<T: Serialize> {
    pub data: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(DataBody { data })).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(DataBody { data })).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn success_paginated<T: Serialize>(
    data: Vec<T>,
    total: u64,
    limit: u64,
    offset: u64,
) -> Response {
    (
        StatusCode::OK,
        Json(PaginatedBody {
            data,
            total,
            limit,
            offset,
        }),
    )
        .into_response()
}

pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: code.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub fn bad_request(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, "bad_request", message)
}

pub fn not_found(message: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn conflict(message: &str) -> Response {
    error_response(StatusCode::CONFLICT, "conflict", message)
}

pub fn internal_error(message: &str) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

/// Decodes a JSON body into a request type, mapping any shape mismatch to
/// a uniform 400 instead of the extractor's 422.
pub fn decode<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> std::result::Result<T, Response> {
    serde_json::from_value(value).map_err(|_| bad_request("invalid request body"))
}

/// Maps storage failures onto the error envelope. Unexpected database
/// errors are logged here with context and surfaced as opaque 500s.
pub fn storage_error(context: &str, err: StorageError) -> Response {
    match &err {
        StorageError::NotFound { .. } => not_found(&err.to_string()),
        StorageError::Conflict { .. } => conflict(&err.to_string()),
        StorageError::Validation(msg) => bad_request(msg),
        StorageError::Corrupt { .. } | StorageError::Db(_) | StorageError::Json(_) => {
            tracing::error!(error = %err, "{context}");
            internal_error(context)
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_secs: i64,
    storage_status: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let storage_status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    };
    success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        storage_status,
    })
}
