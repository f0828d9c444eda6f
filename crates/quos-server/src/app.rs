use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;
use crate::{api, logging};

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.config.cors_origins();
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_http_app(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/services",
            get(api::services::list).post(api::services::create),
        )
        .route("/api/services/{id}", get(api::services::get))
        .route(
            "/api/departments",
            get(api::departments::list).post(api::departments::create),
        )
        .route(
            "/api/departments/{id}",
            get(api::departments::get)
                .patch(api::departments::update)
                .delete(api::departments::delete),
        )
        .route(
            "/api/metrics",
            get(api::metrics::list).post(api::metrics::create),
        )
        .route("/api/metrics/chart", get(api::metrics::chart))
        .route("/api/rules", get(api::rules::list).post(api::rules::create))
        .route(
            "/api/rules/{id}",
            get(api::rules::get)
                .patch(api::rules::update)
                .delete(api::rules::delete),
        )
        .route("/api/incidents", get(api::incidents::list))
        .route(
            "/api/incidents/{id}",
            get(api::incidents::get).patch(api::incidents::update),
        )
        .route(
            "/api/incidents/{id}/comments",
            get(api::incidents::list_comments).post(api::incidents::create_comment),
        )
        .route(
            "/api/incidents/{id}/comments/{comment_id}",
            axum::routing::delete(api::incidents::delete_comment),
        )
        .route("/api/incidents/{id}/events", get(api::incidents::list_events))
        .route(
            "/api/incidents/{id}/notifications",
            get(api::notifications::list_by_incident),
        )
        .route("/api/notifications", get(api::notifications::list))
        .route("/api/notifications/{id}", get(api::notifications::get))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(logging::request_logging))
}
