//! nerid Core - Domain types, traits, and shared errors
//!
//! This crate defines the core abstractions used throughout nerid:
//! - Classified tokens and merged entity spans
//! - The label registry shared by classifier and renderer boundaries
//! - Common error types
//! - The token classifier trait
//! - Configuration management

pub mod config;
pub mod labels;

pub use config::{
    AppConfig, BackgroundPolicy, ClassifierBackend, ClassifierConfig, ConfigError, LoggingConfig,
    MergeConfig, ServerConfig,
};
pub use labels::{LabelDef, LabelRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for nerid operations
#[derive(Error, Debug)]
pub enum NeridError {
    #[error("Invalid token sequence at index {index}: {reason}")]
    InvalidTokenSequence { index: usize, reason: String },

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Span {start}..{end} is outside text of length {len}")]
    OffsetOutOfRange { start: usize, end: usize, len: usize },

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Classifier error: {0}")]
    ClassifierError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NeridError {
    /// Whether the error comes from the token data rather than infrastructure.
    ///
    /// Data errors degrade a single request to "no highlighting"; everything
    /// else is reported to the caller.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenSequence { .. } | Self::UnknownLabel(_) | Self::OffsetOutOfRange { .. }
        )
    }
}

impl From<ConfigError> for NeridError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NeridError>;

// ============================================================================
// Tokens and Spans
// ============================================================================

/// A unit of text tagged by a token classifier.
///
/// `start` and `end` are character offsets forming the half-open range
/// `[start, end)` into the original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedToken {
    pub label: String,
    pub start: usize,
    pub end: usize,

    /// Model confidence, when the classifier reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl ClassifiedToken {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A maximal run of same-label tokens merged into one labeled range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl EntitySpan {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-express the span as a single token
    pub fn to_token(&self) -> ClassifiedToken {
        ClassifiedToken::new(self.label.clone(), self.start, self.end)
    }
}

impl From<&ClassifiedToken> for EntitySpan {
    fn from(token: &ClassifiedToken) -> Self {
        Self::new(token.label.clone(), token.start, token.end)
    }
}

/// Character offset table for one text.
///
/// Built once per text so that many spans can be sliced, and many byte
/// offsets converted, without rescanning from the start.
pub struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` as the final boundary
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let boundaries = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        Self { text, boundaries }
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Slice by character offsets `[start, end)`; `None` when out of range
    pub fn slice(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }

        let byte_start = *self.boundaries.get(start)?;
        let byte_end = *self.boundaries.get(end)?;
        self.text.get(byte_start..byte_end)
    }

    /// Character offset of a byte offset lying on a char boundary
    pub fn char_offset(&self, byte: usize) -> usize {
        self.boundaries.partition_point(|&b| b < byte)
    }
}

/// Slice `text` by character offsets `[start, end)`.
///
/// Returns `None` when the range does not fit inside the text.
pub fn slice_chars(text: &str, start: usize, end: usize) -> Option<&str> {
    CharIndex::new(text).slice(start, end)
}

// ============================================================================
// Classifier Trait
// ============================================================================

/// Produces tagged tokens from raw text.
///
/// Labels are returned as the model emits them (for example `B-PER`);
/// normalization against the label registry happens downstream.
#[async_trait]
pub trait TokenClassifier: Send + Sync {
    /// Classify the text into an ordered token sequence
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedToken>>;

    /// Backend name used in logs and readiness output
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier(Vec<ClassifiedToken>);

    #[async_trait]
    impl TokenClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<Vec<ClassifiedToken>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_slice_chars_ascii() {
        assert_eq!(slice_chars("Budi tinggal", 0, 4), Some("Budi"));
        assert_eq!(slice_chars("Budi tinggal", 5, 12), Some("tinggal"));
        assert_eq!(slice_chars("Budi", 4, 4), Some(""));
    }

    #[test]
    fn test_slice_chars_multibyte() {
        let text = "Café di Bandung";
        assert_eq!(slice_chars(text, 0, 4), Some("Café"));
        assert_eq!(slice_chars(text, 8, 15), Some("Bandung"));
    }

    #[test]
    fn test_char_index_offsets() {
        let index = CharIndex::new("Café é Bandung");
        assert_eq!(index.char_len(), 14);
        assert_eq!(index.char_offset(6), 5);
        assert_eq!(index.char_offset("Café é Bandung".len()), 14);
        assert_eq!(index.slice(7, 14), Some("Bandung"));
        assert_eq!(index.slice(0, 15), None);
    }

    #[test]
    fn test_slice_chars_out_of_range() {
        assert_eq!(slice_chars("abc", 1, 4), None);
        assert_eq!(slice_chars("abc", 2, 1), None);
        assert_eq!(slice_chars("abc", 5, 5), None);
    }

    #[test]
    fn test_data_error_classification() {
        assert!(NeridError::UnknownLabel("X".into()).is_data_error());
        assert!(NeridError::InvalidTokenSequence {
            index: 0,
            reason: "empty".into()
        }
        .is_data_error());
        assert!(!NeridError::ClassifierUnavailable("down".into()).is_data_error());
        assert!(!NeridError::ValidationError("empty".into()).is_data_error());
    }

    #[test]
    fn test_token_serde_without_score() {
        let token: ClassifiedToken =
            serde_json::from_str(r#"{"label":"PER","start":0,"end":4}"#).unwrap();
        assert_eq!(token, ClassifiedToken::new("PER", 0, 4));

        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("score"));
    }

    #[tokio::test]
    async fn test_classifier_trait_object() {
        let classifier: Box<dyn TokenClassifier> =
            Box::new(FixedClassifier(vec![ClassifiedToken::new("B-PER", 0, 4)]));

        let tokens = classifier.classify("Budi").await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(classifier.name(), "fixed");
    }
}
