//! Per-token semantic mapping of poem text to emoji.
//!
//! One deterministic pass: each token is decided independently against a
//! fixed concept bank and threshold, with no cross-token context. The
//! threshold travels with the call (via [`MapperConfig`]), not with the bank,
//! so it can be tuned per request without rebuilding vectors.

use crate::bank::ConceptBank;
use crate::preprocess;
use crate::types::{Explanation, MapperConfig};
use tracing::{debug, warn};

/// Placeholder for tokens no concept qualifies for.
pub const UNKNOWN_EMOJI: &str = "❓";
/// Placeholder for short connector/stop tokens.
pub const CONNECTOR_EMOJI: &str = "·";

pub const UNKNOWN_LABEL: &str = "unknown";
pub const CONNECTOR_LABEL: &str = "connector/stop";

/// Maximum char length at which an unmatched token counts as a connector.
const CONNECTOR_MAX_CHARS: usize = 2;

/// Semantic poem mapper over an explicitly passed concept bank.
pub struct SemanticMapper<'a> {
    bank: &'a ConceptBank,
    config: MapperConfig,
}

impl<'a> SemanticMapper<'a> {
    pub fn new(bank: &'a ConceptBank) -> Self {
        Self {
            bank,
            config: MapperConfig::default(),
        }
    }

    pub fn with_config(bank: &'a ConceptBank, config: MapperConfig) -> Self {
        Self { bank, config }
    }

    /// Map a poem to an emoji sequence plus a positionally aligned
    /// explanation trail.
    ///
    /// One emoji and one explanation per non-empty token, in token order. A
    /// failed lookup degrades that single token to a placeholder; it never
    /// aborts the rest of the poem.
    pub fn map(&self, text: &str) -> (Vec<String>, Vec<Explanation>) {
        let tokens = preprocess::tokenize(text);
        let mut mapped = Vec::with_capacity(tokens.len());
        let mut explanations = Vec::with_capacity(tokens.len());

        for token in tokens {
            if token.trim().is_empty() {
                continue;
            }

            let results = match self.bank.find_best(&token, self.config.top_k) {
                Ok(results) => results,
                Err(e) => {
                    warn!("lookup failed for token '{token}': {e}");
                    Vec::new()
                }
            };

            let (best, best_score) = match results.into_iter().next() {
                Some(m) => (Some(m.concept), m.similarity),
                None => (None, 0.0),
            };

            match best {
                Some(concept) if best_score >= self.config.similarity_threshold => {
                    let symbol = concept
                        .emoji
                        .first()
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_EMOJI.to_string());
                    mapped.push(symbol);
                    explanations.push(Explanation {
                        token: token.clone(),
                        concept: Some(concept.id),
                        label: concept.label,
                        sim: best_score,
                        emoji: concept.emoji,
                    });
                }
                _ => {
                    let (symbol, label) = if token.chars().count() <= CONNECTOR_MAX_CHARS {
                        (CONNECTOR_EMOJI, CONNECTOR_LABEL)
                    } else {
                        (UNKNOWN_EMOJI, UNKNOWN_LABEL)
                    };
                    mapped.push(symbol.to_string());
                    explanations.push(Explanation {
                        token: token.clone(),
                        concept: None,
                        label: label.to_string(),
                        sim: best_score,
                        emoji: vec![symbol.to_string()],
                    });
                }
            }
        }

        debug!("Mapped {} tokens", mapped.len());
        (mapped, explanations)
    }
}
