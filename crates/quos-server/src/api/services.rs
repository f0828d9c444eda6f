use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::{bad_request, created, decode, storage_error, success};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: CreateServiceRequest = match decode(body) {
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
        .create_service(&req.id, &req.name, req.description.as_deref())
        .await
    {
        Ok(service) => created(service),
        Err(e) => storage_error("failed to create service", e),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_service(&id).await {
        Ok(service) => success(service),
        Err(e) => storage_error("failed to get service", e),
    }
}

pub async fn list(State(state): State<AppState>) -> Response {
    match state.store.list_services().await {
        Ok(services) => success(services),
        Err(e) => storage_error("failed to list services", e),
    }
}
