use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use quos_common::types::{CompareOp, MetricType, RuleAction, Severity};
use quos_storage::{NewRule, RuleFilter, RuleUpdate};

use crate::api::pagination::PaginationParams;
use crate::api::{
    bad_request, created, decode, no_content, storage_error, success, success_paginated,
};
use crate::state::AppState;

/// Rule create/update body. Enum fields arrive as raw strings and are
/// parsed explicitly so validation errors name the offending field.
#[derive(Deserialize)]
pub struct RuleRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metric_type: String,
    pub threshold: f64,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub department_id: Option<String>,
}

struct ParsedRule {
    metric_type: MetricType,
    operator: CompareOp,
    action: RuleAction,
    severity: Severity,
}

fn parse_enums(req: &RuleRequest) -> Result<ParsedRule, Response> {
    let metric_type = req
        .metric_type
        .parse()
        .map_err(|_| bad_request("invalid metric_type"))?;
    let operator = req
        .operator
        .parse()
        .map_err(|_| bad_request("invalid operator"))?;
    let action = req
        .action
        .parse()
        .map_err(|_| bad_request("invalid action"))?;
    let severity = req
        .severity
        .parse()
        .map_err(|_| bad_request("invalid severity"))?;
    Ok(ParsedRule {
        metric_type,
        operator,
        action,
        severity,
    })
}

pub async fn create(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    let req: RuleRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.id.is_empty() {
        return bad_request("id is required");
    }
    let parsed = match parse_enums(&req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let new_rule = NewRule {
        id: req.id.clone(),
        metric_type: parsed.metric_type,
        threshold: req.threshold,
        operator: parsed.operator,
        action: parsed.action,
        priority: req.priority,
        severity: parsed.severity,
        is_active: req.is_active,
        department_id: req.department_id.clone(),
    };
    match state.store.create_rule(&new_rule).await {
        Ok(rule) => created(rule),
        Err(e) => storage_error("failed to create rule", e),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get_rule(&id).await {
        Ok(rule) => success(rule),
        Err(e) => storage_error("failed to get rule", e),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: RuleRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let parsed = match parse_enums(&req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let update = RuleUpdate {
        metric_type: parsed.metric_type,
        threshold: req.threshold,
        operator: parsed.operator,
        action: parsed.action,
        priority: req.priority,
        severity: parsed.severity,
        is_active: req.is_active,
        department_id: req.department_id.clone(),
    };
    match state.store.update_rule(&id, &update).await {
        Ok(rule) => success(rule),
        Err(e) => storage_error("failed to update rule", e),
    }
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete_rule(&id).await {
        Ok(()) => no_content(),
        Err(e) => storage_error("failed to delete rule", e),
    }
}

#[derive(Deserialize)]
pub struct RuleListParams {
    #[serde(default)]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let metric_type_eq = match &params.metric_type {
        Some(raw) => match raw.parse::<MetricType>() {
            Ok(mt) => Some(mt),
            Err(_) => return bad_request("invalid metric_type"),
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
    let filter = RuleFilter {
        metric_type_eq,
        severity_eq,
        is_active_eq: params.is_active,
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_rules(&filter).await {
        Ok(c) => c,
        Err(e) => return storage_error("failed to count rules", e),
    };
    match state.store.list_rules(&filter, limit, offset).await {
        Ok(rules) => success_paginated(rules, total, limit, offset),
        Err(e) => storage_error("failed to list rules", e),
    }
}
