use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use quos_common::types::MetricType;
use quos_storage::{BucketSize, MetricFilter, NewMetric};

use crate::api::pagination::PaginationParams;
use crate::api::{bad_request, created, decode, storage_error, success, success_paginated};
use crate::state::AppState;

/// Ingest entry point. `metric_type` arrives as a raw string so an unknown
/// value maps to a specific 400 rather than a generic body-decode failure.
#[derive(Deserialize)]
pub struct CreateMetricRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub metric_type: String,
    pub value: f64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let req: CreateMetricRequest = match decode(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.service_id.is_empty() {
        return bad_request("service_id is required");
    }
    if req.metric_type.is_empty() {
        return bad_request("metric_type is required");
    }
    let metric_type: MetricType = match req.metric_type.parse() {
        Ok(mt) => mt,
        Err(_) => return bad_request("invalid metric_type"),
    };

    let new_metric = NewMetric {
        service_id: req.service_id,
        metric_type,
        value: req.value,
        recorded_at: req.recorded_at,
    };
    match state.store.admit_metric(&new_metric).await {
        Ok(metric) => created(metric),
        Err(e) => storage_error("failed to create metric", e),
    }
}

#[derive(Deserialize)]
pub struct MetricListParams {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub metric_type: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<MetricListParams>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let metric_type_eq = match &params.metric_type {
        Some(raw) => match raw.parse::<MetricType>() {
            Ok(mt) => Some(mt),
            Err(_) => return bad_request("invalid metric_type"),
        },
        None => None,
    };
    let filter = MetricFilter {
        service_id_eq: params.service_id.clone(),
        metric_type_eq,
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_metrics(&filter).await {
        Ok(c) => c,
        Err(e) => return storage_error("failed to count metrics", e),
    };
    match state.store.list_metrics(&filter, limit, offset).await {
        Ok(metrics) => success_paginated(metrics, total, limit, offset),
        Err(e) => storage_error("failed to list metrics", e),
    }
}

#[derive(Deserialize)]
pub struct ChartParams {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Bucketed aggregation for dashboards. Defaults to the last 24 hours with
/// a bucket size picked from the range span; an explicit `bucket` wins.
pub async fn chart(State(state): State<AppState>, Query(params): Query<ChartParams>) -> Response {
    let to = match &params.to {
        Some(raw) => match raw.parse::<DateTime<Utc>>() {
            Ok(t) => t,
            Err(_) => return bad_request("invalid 'to' time format, use RFC3339"),
        },
        None => Utc::now(),
    };
    let from = match &params.from {
        Some(raw) => match raw.parse::<DateTime<Utc>>() {
            Ok(t) => t,
            Err(_) => return bad_request("invalid 'from' time format, use RFC3339"),
        },
        None => to - chrono::Duration::hours(24),
    };

    let span = to - from;
    let mut bucket = if span > chrono::Duration::hours(24) {
        BucketSize::Day
    } else if span > chrono::Duration::hours(4) {
        BucketSize::Hour
    } else {
        BucketSize::Minute
    };
    if let Some(raw) = &params.bucket {
        match raw.parse::<BucketSize>() {
            Ok(b) => bucket = b,
            Err(_) => return bad_request("invalid bucket, use minute|hour|day"),
        }
    }

    let metric_type_eq = match &params.metric_type {
        Some(raw) => match raw.parse::<MetricType>() {
            Ok(mt) => Some(mt),
            Err(_) => return bad_request("invalid metric_type"),
        },
        None => None,
    };
    let filter = MetricFilter {
        service_id_eq: params.service_id.clone(),
        metric_type_eq,
    };

    match state
        .store
        .aggregate_metrics(&filter, from, to, bucket)
        .await
    {
        Ok(buckets) => success(buckets),
        Err(e) => storage_error("failed to get chart data", e),
    }
}
