//! Span merging
//!
//! Collapses a flat sequence of per-token labels into the minimal sequence
//! of labeled spans: consecutive tokens with an identical label become one
//! span covering their full range. Labels are compared verbatim, so tags
//! must already be normalized (see [`crate::tagging`]).

use nerid_core::{ClassifiedToken, EntitySpan, NeridError, Result};

/// Check that tokens have non-empty ranges in left-to-right order.
///
/// A token must start at or after the previous token's end; anything else
/// would produce overlapping or shrinking spans.
pub fn validate_tokens(tokens: &[ClassifiedToken]) -> Result<()> {
    let mut prev: Option<&ClassifiedToken> = None;

    for (index, token) in tokens.iter().enumerate() {
        if token.end <= token.start {
            return Err(NeridError::InvalidTokenSequence {
                index,
                reason: format!("empty or inverted range {}..{}", token.start, token.end),
            });
        }

        if let Some(prev) = prev {
            if token.start < prev.start {
                return Err(NeridError::InvalidTokenSequence {
                    index,
                    reason: format!(
                        "starts at {} before previous token start {}",
                        token.start, prev.start
                    ),
                });
            }
            if token.start < prev.end {
                return Err(NeridError::InvalidTokenSequence {
                    index,
                    reason: format!(
                        "starts at {} inside previous token ending at {}",
                        token.start, prev.end
                    ),
                });
            }
        }

        prev = Some(token);
    }

    Ok(())
}

/// Merge validated tokens into entity spans.
///
/// Empty input yields an empty result.
pub fn merge(tokens: &[ClassifiedToken]) -> Result<Vec<EntitySpan>> {
    validate_tokens(tokens)?;
    Ok(merge_unchecked(tokens))
}

/// Merge without validation; malformed input yields malformed spans.
pub fn merge_unchecked(tokens: &[ClassifiedToken]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut current: Option<EntitySpan> = None;

    for token in tokens {
        // Same label: extend, start stays where the run opened
        if let Some(span) = current.as_mut().filter(|s| s.label == token.label) {
            span.end = token.end;
            continue;
        }

        if let Some(done) = current.replace(EntitySpan::from(token)) {
            spans.push(done);
        }
    }

    spans.extend(current);
    spans
}
