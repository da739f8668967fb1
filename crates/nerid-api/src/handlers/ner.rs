//! Entity highlighting handlers
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use nerid_core::ClassifiedToken;
use nerid_extractor::HighlightedSpan;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Highlighting request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct NerRequest {
    /// Text to analyze
    #[schema(example = "Nama saya Budi Santoso, tinggal di Jakarta.")]
    pub text: String,
}

/// A merged entity span
#[derive(Debug, Serialize, ToSchema)]
pub struct SpanOutput {
    /// Canonical label
    #[schema(example = "PER")]
    pub label: String,

    /// Start character offset (inclusive)
    #[schema(example = 10)]
    pub start: usize,

    /// End character offset (exclusive)
    #[schema(example = 22)]
    pub end: usize,

    /// Covered text
    #[schema(example = "Budi Santoso")]
    pub text: String,

    /// Display color, absent for unregistered labels
    #[schema(example = "#ffadad")]
    pub color: Option<String>,
}

impl From<HighlightedSpan> for SpanOutput {
    fn from(span: HighlightedSpan) -> Self {
        Self {
            label: span.label,
            start: span.start,
            end: span.end,
            text: span.text,
            color: span.color,
        }
    }
}

/// Highlighting response body
#[derive(Debug, Serialize, ToSchema)]
pub struct NerResponse {
    /// Original text
    pub text: String,

    /// Merged spans in text order
    pub spans: Vec<SpanOutput>,

    /// Set when highlighting was dropped for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,

    /// Classifier backend that produced the tokens
    #[schema(example = "http:cindyangelira/ner-roberta-large-bahasa-indonesia")]
    pub classifier: String,

    /// Processing time in milliseconds
    #[schema(example = 120)]
    pub processing_time_ms: u64,
}

/// Classify text and return highlighted spans
#[utoipa::path(
    post,
    path = "/api/v1/ner",
    tag = "ner",
    request_body = NerRequest,
    responses(
        (status = 200, description = "Text analyzed", body = NerResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 502, description = "Entity model failed", body = crate::error::ApiError),
        (status = 503, description = "Entity model unavailable", body = crate::error::ApiError)
    )
)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let start = Instant::now();

    let analysis = state.pipeline.analyze(&req.text).await?;
    if analysis.is_degraded() {
        state.record_degraded();
    }

    let response = NerResponse {
        text: analysis.text,
        spans: analysis.spans.into_iter().map(SpanOutput::from).collect(),
        degraded: analysis.degraded,
        classifier: state.pipeline.classifier_name().to_string(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// A pre-classified token supplied by the caller
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenInput {
    /// Raw model label, IOB prefix allowed
    #[schema(example = "B-PER")]
    pub label: String,
    #[schema(example = 0)]
    pub start: usize,
    #[schema(example = 4)]
    pub end: usize,
    pub score: Option<f32>,
}

impl From<TokenInput> for ClassifiedToken {
    fn from(input: TokenInput) -> Self {
        Self {
            label: input.label,
            start: input.start,
            end: input.end,
            score: input.score,
        }
    }
}

/// Merge request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct MergeRequest {
    /// Text the token offsets refer to
    pub text: String,
    /// Tokens in text order
    pub tokens: Vec<TokenInput>,
}

/// Merge response body
#[derive(Debug, Serialize, ToSchema)]
pub struct MergeResponse {
    pub spans: Vec<SpanOutput>,
}

/// Merge caller-supplied tokens without running the classifier
#[utoipa::path(
    post,
    path = "/api/v1/merge",
    tag = "ner",
    request_body = MergeRequest,
    responses(
        (status = 200, description = "Tokens merged", body = MergeResponse),
        (status = 400, description = "Text exceeds the length limit", body = crate::error::ApiError),
        (status = 422, description = "Malformed token sequence or unknown label", body = crate::error::ApiError)
    )
)]
pub async fn merge_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MergeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens: Vec<ClassifiedToken> = req.tokens.into_iter().map(Into::into).collect();

    // Caller-supplied data: report the failure instead of degrading
    let spans = state.pipeline.spans_for(&req.text, tokens)?;

    Ok((
        StatusCode::OK,
        Json(MergeResponse {
            spans: spans.into_iter().map(SpanOutput::from).collect(),
        }),
    ))
}
