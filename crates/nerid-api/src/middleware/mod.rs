//! Request tracking middleware
//!
//! Counts requests, tags each response with an `x-request-id` and logs
//! method, path, status and latency.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request tracking middleware
pub async fn request_tracking_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.increment_requests();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    let latency_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(%request_id, %method, path = %path, status = status.as_u16(), latency_ms, "Request failed");
    } else {
        tracing::info!(%request_id, %method, path = %path, status = status.as_u16(), latency_ms, "Request completed");
    }

    response
}
