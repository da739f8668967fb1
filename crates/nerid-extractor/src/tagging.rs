//! Tag normalization
//!
//! Models emit IOB-tagged labels (`B-PER`, `I-PER`) and sometimes legacy
//! names (`PERSON`). Before merging, every token label is reduced to the
//! canonical registry name so that runs compare equal.

use nerid_core::{ClassifiedToken, LabelRegistry, MergeConfig, NeridError, Result};

/// Options for [`normalize_tokens`]
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Tokens scored below this become background
    pub min_score: f32,
    /// Fail on labels missing from the registry
    pub strict_labels: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            strict_labels: true,
        }
    }
}

impl From<&MergeConfig> for NormalizeOptions {
    fn from(config: &MergeConfig) -> Self {
        Self {
            min_score: config.min_score,
            strict_labels: config.strict_labels,
        }
    }
}

/// Remove a leading IOB marker (`B-` or `I-`) from a model label
pub fn strip_tag_prefix(raw: &str) -> &str {
    raw.strip_prefix("B-")
        .or_else(|| raw.strip_prefix("I-"))
        .unwrap_or(raw)
}

/// Map raw model labels onto canonical registry labels.
///
/// Low-confidence tokens are relabeled as background. Unknown labels fail
/// with [`NeridError::UnknownLabel`] in strict mode and pass through
/// unchanged otherwise.
pub fn normalize_tokens(
    tokens: Vec<ClassifiedToken>,
    registry: &LabelRegistry,
    options: NormalizeOptions,
) -> Result<Vec<ClassifiedToken>> {
    tokens
        .into_iter()
        .map(|mut token| {
            if token.score.is_some_and(|s| s < options.min_score) {
                token.label = registry.background().to_string();
                return Ok(token);
            }

            let bare = strip_tag_prefix(&token.label);
            match registry.resolve(bare) {
                Some(def) => token.label = def.name.clone(),
                None if options.strict_labels => {
                    return Err(NeridError::UnknownLabel(token.label));
                }
                None => token.label = bare.to_string(),
            }

            Ok(token)
        })
        .collect()
}
