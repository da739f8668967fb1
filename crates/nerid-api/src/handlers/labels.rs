//! Label registry handler
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// One registry entry
#[derive(Debug, Serialize, ToSchema)]
pub struct LabelInfo {
    #[schema(example = "PER")]
    pub name: String,
    #[schema(example = "#ffadad")]
    pub color: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
}

/// Label registry response
#[derive(Debug, Serialize, ToSchema)]
pub struct LabelsResponse {
    /// Label used for non-entity tokens
    #[schema(example = "O")]
    pub background: String,
    pub labels: Vec<LabelInfo>,
}

/// List the label to color table used for rendering
#[utoipa::path(
    get,
    path = "/api/v1/labels",
    tag = "labels",
    responses(
        (status = 200, description = "Label registry", body = LabelsResponse)
    )
)]
pub async fn list_labels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry();

    Json(LabelsResponse {
        background: registry.background().to_string(),
        labels: registry
            .labels()
            .iter()
            .map(|l| LabelInfo {
                name: l.name.clone(),
                color: l.color.clone(),
                aliases: l.aliases.clone(),
                description: l.description.clone(),
            })
            .collect(),
    })
}
