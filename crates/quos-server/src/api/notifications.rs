use axum::extract::{Path, Query, State};
use axum::response::Response;

use crate::api::pagination::PaginationParams;
use crate::api::{storage_error, success, success_paginated};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let limit = pagination.limit();
    let offset = pagination.offset();
    let total = match state.store.count_notifications().await {
        Ok(c) => c,
        Err(e) => return storage_error("failed to count notifications", e),
    };
    match state.store.list_notifications(limit, offset).await {
        Ok(notifications) => success_paginated(notifications, total, limit, offset),
        Err(e) => storage_error("failed to list notifications", e),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_notification(&id).await {
        Ok(notification) => success(notification),
        Err(e) => storage_error("failed to get notification", e),
    }
}

pub async fn list_by_incident(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.list_notifications_by_incident(&id).await {
        Ok(notifications) => success(notifications),
        Err(e) => storage_error("failed to list notifications", e),
    }
}
