use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use quos_common::types::{IncidentStatus, Severity};
use quos_storage::IncidentFilter;

use crate::api::pagination::PaginationParams;
use crate::api::{
    bad_request, created, decode, no_content, storage_error, success, success_paginated,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IncidentListParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<IncidentListParams>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let status_eq = match &params.status {
        Some(raw) => match raw.parse::<IncidentStatus>() {
            Ok(s) => Some(s),
            Err(_) => return bad_request("invalid status"),
        },
        None => None,
    };
    let severity_eq = match &params.severity {
        Some(raw) => match raw.parse::<Severity>() {
            Ok(s) => Some(s),
            Err(_) => return bad_request("invalid severity"),
        },
        None => None,
    };
    let filter = IncidentFilter {
        status_eq,
        severity_eq,
        service_id_eq: params.service_id.clone(),
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_incidents(&filter).await {
        Ok(c) => c,
        Err(e) => return storage_error("failed to count incidents", e),
    };
    match state.store.list_incidents(&filter, limit, offset).await {
        Ok(incidents) => success_paginated(incidents, total, limit, offset),
        Err(e) => storage_error("failed to list incidents", e),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_incident(&id).await {
        Ok(incident) => success(incident),
        Err(e) => storage_error("failed to get incident", e),
    }
}

#[derive(Deserialize)]
pub struct UpdateIncidentRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Status transition endpoint. The storage layer enforces the state machine
/// and appends the `STATUS_CHANGED` timeline event on effective changes.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: UpdateIncidentRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let status: IncidentStatus = match req.status.parse() {
        Ok(s) => s,
        Err(_) => return bad_request("invalid status"),
    };
    let actor = req.actor.as_deref().unwrap_or("system");
    match state.store.update_incident_status(&id, status, actor).await {
        Ok(incident) => success(incident),
        Err(e) => storage_error("failed to update incident", e),
    }
}

// ---- comments ----

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: CreateCommentRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.content.is_empty() {
        return bad_request("content is required");
    }
    let author = if req.author.is_empty() {
        "anonymous"
    } else {
        &req.author
    };
    match state.store.create_comment(&id, author, &req.content).await {
        Ok(comment) => created(comment),
        Err(e) => storage_error("failed to create comment", e),
    }
}

pub async fn list_comments(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.list_comments(&id).await {
        Ok(comments) => success(comments),
        Err(e) => storage_error("failed to list comments", e),
    }
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let comment_id = match Uuid::parse_str(&comment_id) {
        Ok(cid) => cid,
        Err(_) => return bad_request("invalid comment id"),
    };
    match state.store.delete_comment(&id, comment_id).await {
        Ok(()) => no_content(),
        Err(e) => storage_error("failed to delete comment", e),
    }
}

// ---- timeline ----

pub async fn list_events(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.list_incident_events(&id).await {
        Ok(events) => success(events),
        Err(e) => storage_error("failed to list incident events", e),
    }
}
