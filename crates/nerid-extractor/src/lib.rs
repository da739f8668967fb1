//! nerid Extractor - Entity span extraction pipeline
//!
//! Turns per-token classifier output into merged, labeled entity spans:
//! tag normalization, background handling, span merging and color
//! annotation, plus the classifier backends that feed it.

use std::sync::Arc;

use nerid_core::{ClassifierBackend, ClassifierConfig, Result, TokenClassifier};

pub mod http;
pub mod merge;
pub mod pipeline;
pub mod rules;
pub mod tagging;

pub use http::HttpTokenClassifier;
pub use merge::{merge, merge_unchecked, validate_tokens};
pub use pipeline::{Analysis, HighlightedSpan, NerPipeline};
pub use rules::RuleBasedClassifier;
pub use tagging::{normalize_tokens, strip_tag_prefix, NormalizeOptions};

/// Construct the configured classifier once, for injection into the request path
pub fn build_classifier(config: &ClassifierConfig) -> Result<Arc<dyn TokenClassifier>> {
    let classifier: Arc<dyn TokenClassifier> = match config.backend {
        ClassifierBackend::Http => Arc::new(HttpTokenClassifier::from_config(config)?),
        ClassifierBackend::Rules => Arc::new(RuleBasedClassifier::new()),
    };

    tracing::info!(backend = classifier.name(), "Token classifier initialized");

    Ok(classifier)
}
