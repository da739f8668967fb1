//! NER request pipeline
//!
//! One request: classify the text with the injected classifier, normalize
//! tags, apply the background policy, merge runs and attach span text and
//! display colors. Data failures degrade the request to "no highlighting";
//! classifier failures are returned to the caller.

use std::sync::Arc;

use serde::Serialize;

use nerid_core::{
    BackgroundPolicy, CharIndex, ClassifiedToken, EntitySpan, LabelRegistry, MergeConfig,
    NeridError, Result, TokenClassifier,
};

use crate::merge::merge;
use crate::tagging::normalize_tokens;

/// A merged span ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightedSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
    /// Covered text
    pub text: String,
    /// Registry color; absent for unregistered labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Result of analyzing one text
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub text: String,
    pub spans: Vec<HighlightedSpan>,
    /// Why highlighting was dropped, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Analysis {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Entity extraction pipeline around an injected classifier
#[derive(Clone)]
pub struct NerPipeline {
    classifier: Arc<dyn TokenClassifier>,
    registry: Arc<LabelRegistry>,
    config: MergeConfig,
}

impl NerPipeline {
    pub fn new(
        classifier: Arc<dyn TokenClassifier>,
        registry: Arc<LabelRegistry>,
        config: MergeConfig,
    ) -> Self {
        Self {
            classifier,
            registry,
            config,
        }
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Reject empty or oversized input
    pub fn validate_text(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(NeridError::ValidationError(
                "Text cannot be empty".to_string(),
            ));
        }

        self.check_length(text.chars().count())
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.config.max_text_chars {
            return Err(NeridError::ValidationError(format!(
                "Text has {len} characters, limit is {}",
                self.config.max_text_chars
            )));
        }

        Ok(())
    }

    /// Classify and highlight a text
    pub async fn analyze(&self, text: &str) -> Result<Analysis> {
        self.validate_text(text)?;

        let tokens = self.classifier.classify(text).await?;
        tracing::debug!(
            classifier = self.classifier.name(),
            tokens = tokens.len(),
            "Text classified"
        );

        match self.spans_for(text, tokens) {
            Ok(spans) => Ok(Analysis {
                text: text.to_string(),
                spans,
                degraded: None,
            }),
            Err(e) if e.is_data_error() => {
                tracing::warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Dropping highlighting for request"
                );
                Ok(Analysis {
                    text: text.to_string(),
                    spans: Vec::new(),
                    degraded: Some(e.to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Turn already-classified tokens into highlighted spans for `text`
    ///
    /// Oversized text is a `ValidationError`, as in [`Self::analyze`].
    pub fn spans_for(
        &self,
        text: &str,
        tokens: Vec<ClassifiedToken>,
    ) -> Result<Vec<HighlightedSpan>> {
        let index = CharIndex::new(text);
        let len = index.char_len();
        self.check_length(len)?;

        self.merge_tokens(tokens)?
            .into_iter()
            .map(|span| {
                let covered = index.slice(span.start, span.end).ok_or(
                    NeridError::OffsetOutOfRange {
                        start: span.start,
                        end: span.end,
                        len,
                    },
                )?;

                Ok(HighlightedSpan {
                    color: self.registry.color(&span.label).map(str::to_string),
                    text: covered.to_string(),
                    label: span.label,
                    start: span.start,
                    end: span.end,
                })
            })
            .collect()
    }

    /// Normalize, apply the background policy and merge
    pub fn merge_tokens(&self, tokens: Vec<ClassifiedToken>) -> Result<Vec<EntitySpan>> {
        let tokens = normalize_tokens(tokens, &self.registry, (&self.config).into())?;
        let background = self.registry.background();

        let tokens: Vec<ClassifiedToken> = match self.config.background_policy {
            BackgroundPolicy::Bridge => tokens
                .into_iter()
                .filter(|t| t.label != background)
                .collect(),
            BackgroundPolicy::Keep | BackgroundPolicy::Drop => tokens,
        };

        let mut spans = merge(&tokens)?;

        if self.config.background_policy == BackgroundPolicy::Drop {
            spans.retain(|s| s.label != background);
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBasedClassifier;
    use async_trait::async_trait;

    /// Returns fixed tokens, or fails like an unreachable model
    struct StubClassifier {
        tokens: Vec<ClassifiedToken>,
        unavailable: bool,
    }

    #[async_trait]
    impl TokenClassifier for StubClassifier {
        async fn classify(&self, _text: &str) -> Result<Vec<ClassifiedToken>> {
            if self.unavailable {
                return Err(NeridError::ClassifierUnavailable("model loading".into()));
            }
            Ok(self.tokens.clone())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn pipeline_with(tokens: Vec<ClassifiedToken>, policy: BackgroundPolicy) -> NerPipeline {
        NerPipeline::new(
            Arc::new(StubClassifier {
                tokens,
                unavailable: false,
            }),
            Arc::new(LabelRegistry::indonesian_pii()),
            MergeConfig {
                background_policy: policy,
                ..Default::default()
            },
        )
    }

    fn tok(label: &str, start: usize, end: usize) -> ClassifiedToken {
        ClassifiedToken::new(label, start, end)
    }

    // "Budi Santoso di Jakarta"
    fn budi_tokens() -> Vec<ClassifiedToken> {
        vec![
            tok("B-PER", 0, 4),
            tok("I-PER", 5, 12),
            tok("O", 13, 15),
            tok("B-LOC", 16, 23),
        ]
    }

    #[tokio::test]
    async fn test_analyze_merges_iob_runs() {
        let pipeline = pipeline_with(budi_tokens(), BackgroundPolicy::Keep);
        let analysis = pipeline.analyze("Budi Santoso di Jakarta").await.unwrap();

        let summary: Vec<(&str, &str)> = analysis
            .spans
            .iter()
            .map(|s| (s.label.as_str(), s.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("PER", "Budi Santoso"), ("O", "di"), ("LOC", "Jakarta")]
        );
        assert_eq!(analysis.spans[0].color.as_deref(), Some("#ffadad"));
        assert!(!analysis.is_degraded());
    }

    #[tokio::test]
    async fn test_drop_policy_removes_background() {
        let pipeline = pipeline_with(budi_tokens(), BackgroundPolicy::Drop);
        let analysis = pipeline.analyze("Budi Santoso di Jakarta").await.unwrap();

        let labels: Vec<&str> = analysis.spans.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["PER", "LOC"]);
    }

    #[test]
    fn test_bridge_policy_joins_across_background() {
        let tokens = vec![tok("B-PER", 0, 4), tok("O", 5, 7), tok("I-PER", 8, 12)];

        let bridged = pipeline_with(vec![], BackgroundPolicy::Bridge)
            .merge_tokens(tokens.clone())
            .unwrap();
        assert_eq!(bridged, vec![EntitySpan::new("PER", 0, 12)]);

        let dropped = pipeline_with(vec![], BackgroundPolicy::Drop)
            .merge_tokens(tokens)
            .unwrap();
        assert_eq!(
            dropped,
            vec![EntitySpan::new("PER", 0, 4), EntitySpan::new("PER", 8, 12)]
        );
    }

    #[tokio::test]
    async fn test_invalid_tokens_degrade() {
        let pipeline = pipeline_with(
            vec![tok("B-PER", 5, 9), tok("B-LOC", 0, 4)],
            BackgroundPolicy::Keep,
        );
        let analysis = pipeline.analyze("Budi di Solo").await.unwrap();

        assert!(analysis.spans.is_empty());
        assert!(analysis
            .degraded
            .unwrap()
            .contains("Invalid token sequence"));
    }

    #[tokio::test]
    async fn test_offset_past_text_degrades() {
        let pipeline = pipeline_with(vec![tok("B-PER", 0, 40)], BackgroundPolicy::Keep);
        let analysis = pipeline.analyze("Budi").await.unwrap();

        assert!(analysis.is_degraded());
        assert!(analysis.spans.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_label_degrades_in_strict_mode() {
        let pipeline = pipeline_with(vec![tok("B-PLATE", 0, 4)], BackgroundPolicy::Keep);
        let analysis = pipeline.analyze("1234").await.unwrap();

        assert!(analysis.degraded.unwrap().contains("Unknown label"));
    }

    #[tokio::test]
    async fn test_classifier_failure_is_an_error() {
        let pipeline = NerPipeline::new(
            Arc::new(StubClassifier {
                tokens: vec![],
                unavailable: true,
            }),
            Arc::new(LabelRegistry::indonesian_pii()),
            MergeConfig::default(),
        );

        let err = pipeline.analyze("Budi").await.unwrap_err();
        assert!(matches!(err, NeridError::ClassifierUnavailable(_)));
    }

    #[tokio::test]
    async fn test_text_validation() {
        let pipeline = NerPipeline::new(
            Arc::new(RuleBasedClassifier::new()),
            Arc::new(LabelRegistry::indonesian_pii()),
            MergeConfig {
                max_text_chars: 10,
                ..Default::default()
            },
        );

        assert!(matches!(
            pipeline.analyze("   ").await,
            Err(NeridError::ValidationError(_))
        ));
        assert!(matches!(
            pipeline.analyze("Budi tinggal di Bandung").await,
            Err(NeridError::ValidationError(_))
        ));
    }

    #[test]
    fn test_spans_for_enforces_length_limit() {
        let pipeline = NerPipeline::new(
            Arc::new(RuleBasedClassifier::empty()),
            Arc::new(LabelRegistry::indonesian_pii()),
            MergeConfig {
                max_text_chars: 4,
                ..Default::default()
            },
        );

        let spans = pipeline
            .spans_for("Budi", vec![tok("B-PER", 0, 4)])
            .unwrap();
        assert_eq!(spans[0].text, "Budi");

        let err = pipeline
            .spans_for("Budi Santoso", vec![tok("B-PER", 0, 4)])
            .unwrap_err();
        assert!(matches!(err, NeridError::ValidationError(_)));
    }

    #[test]
    fn test_spans_for_multibyte_text() {
        let pipeline = pipeline_with(vec![], BackgroundPolicy::Drop);
        let text = "Café é Bandung, José";
        let tokens = vec![
            tok("B-LOC", 7, 14),
            tok("O", 14, 16),
            tok("B-PER", 16, 20),
        ];

        let spans = pipeline.spans_for(text, tokens).unwrap();
        let covered: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(covered, vec!["Bandung", "José"]);

        let err = pipeline
            .spans_for(text, vec![tok("B-PER", 16, 21)])
            .unwrap_err();
        assert!(matches!(err, NeridError::OffsetOutOfRange { len: 20, .. }));
    }

    #[tokio::test]
    async fn test_rules_end_to_end() {
        let pipeline = NerPipeline::new(
            Arc::new(RuleBasedClassifier::new()),
            Arc::new(LabelRegistry::indonesian_pii()),
            MergeConfig::default(),
        );

        let text = "Email saya andi@mail.id, tinggal di Bandung";
        let analysis = pipeline.analyze(text).await.unwrap();

        let labels: Vec<&str> = analysis.spans.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["EMAIL", "LOC"]);
        assert_eq!(analysis.spans[0].text, "andi@mail.id");
        assert_eq!(analysis.spans[1].color.as_deref(), Some("#ffda83"));
    }

    #[tokio::test]
    async fn test_no_tokens_no_spans() {
        let pipeline = pipeline_with(vec![], BackgroundPolicy::Keep);
        let analysis = pipeline.analyze("halo").await.unwrap();

        assert!(analysis.spans.is_empty());
        assert!(!analysis.is_degraded());
    }
}
