use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Generate a 16-character hex trace ID.
fn generate_trace_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..16].to_string()
}

/// Request/response logging middleware. Each request gets a trace id that is
/// logged on both lines and echoed back in the `X-Trace-Id` header.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    tracing::info!(
        trace_id = %trace_id,
        method = %method,
        uri = %uri,
        user_agent = %user_agent,
        "request"
    );

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(trace_id = %trace_id, status = %status, elapsed_ms, "response");
    } else {
        tracing::info!(trace_id = %trace_id, status = %status, elapsed_ms, "response");
    }

    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("X-Trace-Id", val);
    }
    response
}
