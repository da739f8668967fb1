//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{labels, ner};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Highlighting endpoints
        .route("/ner", post(ner::analyze_handler))
        .route("/merge", post(ner::merge_handler))
        // Label registry
        .route("/labels", get(labels::list_labels))
}
