use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::{bad_request, created, decode, no_content, storage_error, success};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateDepartmentRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: CreateDepartmentRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.id.is_empty() {
        return bad_request("id is required");
    }
    if req.name.is_empty() {
        return bad_request("name is required");
    }
    match state
        .store
        .create_department(&req.id, &req.name, req.description.as_deref())
        .await
    {
        Ok(dept) => created(dept),
        Err(e) => storage_error("failed to create department", e),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_department(&id).await {
        Ok(dept) => success(dept),
        Err(e) => storage_error("failed to get department", e),
    }
}

pub async fn list(State(state): State<AppState>) -> Response {
    match state.store.list_departments().await {
        Ok(depts) => success(depts),
        Err(e) => storage_error("failed to list departments", e),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: UpdateDepartmentRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.name.is_empty() {
        return bad_request("name is required");
    }
    match state
        .store
        .update_department(&id, &req.name, req.description.as_deref())
        .await
    {
        Ok(dept) => success(dept),
        Err(e) => storage_error("failed to update department", e),
    }
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete_department(&id).await {
        Ok(()) => no_content(),
        Err(e) => storage_error("failed to delete department", e),
    }
}
