//! Degraded dictionary mapper used when the semantic pipeline is unavailable.
//!
//! Matching is substring containment against a small fixed table of literal
//! Persian strings, checked in insertion order; the first containment wins
//! with the score pinned at 1.0. Output has the same shape as the semantic
//! mapper, so callers and the history store need not care which path ran.

use crate::mapper::{CONNECTOR_EMOJI, CONNECTOR_LABEL, UNKNOWN_EMOJI, UNKNOWN_LABEL};
use crate::preprocess;
use crate::types::Explanation;
use tracing::debug;

/// Built-in literal → emoji entries, highest priority first.
const SIMPLE_MAP: &[(&str, &str)] = &[
    ("عشق", "❤️"),
    ("دل", "💓"),
    ("پارسی", "📜"),
    ("ایران", "🇮🇷"),
    ("رنج", "💪"),
    ("سال", "📅"),
    ("زنده", "🌱"),
    ("می", "🍷"),
    ("ماه", "🌙"),
    ("خورشید", "☀️"),
    ("دریا", "🌊"),
    ("کوه", "⛰️"),
    ("گل", "🌹"),
];

/// Substring mapper with the same output shape as the semantic mapper.
///
/// This path never fails: a token that matches nothing degrades to the
/// connector or unknown placeholder.
pub struct SimpleMapper {
    entries: Vec<(String, String)>,
}

impl Default for SimpleMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleMapper {
    /// Mapper over the built-in dictionary.
    pub fn new() -> Self {
        Self::with_entries(
            SIMPLE_MAP
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Mapper over a caller-supplied dictionary, checked in the given order.
    pub fn with_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Map a poem by substring containment.
    ///
    /// One emoji and one explanation per non-empty token, in token order,
    /// positionally aligned.
    pub fn map(&self, text: &str) -> (Vec<String>, Vec<Explanation>) {
        let tokens = preprocess::tokenize(text);
        let mut mapped = Vec::with_capacity(tokens.len());
        let mut explanations = Vec::with_capacity(tokens.len());

        for token in tokens {
            if token.is_empty() {
                continue;
            }

            let hit = self
                .entries
                .iter()
                .find(|(needle, _)| token.contains(needle.as_str()));

            match hit {
                Some((needle, symbol)) => {
                    mapped.push(symbol.clone());
                    explanations.push(Explanation {
                        token: token.clone(),
                        concept: Some(needle.clone()),
                        label: needle.clone(),
                        sim: 1.0,
                        emoji: vec![symbol.clone()],
                    });
                }
                None => {
                    let (symbol, label) = if token.chars().count() <= 2 {
                        (CONNECTOR_EMOJI, CONNECTOR_LABEL)
                    } else {
                        (UNKNOWN_EMOJI, UNKNOWN_LABEL)
                    };
                    mapped.push(symbol.to_string());
                    explanations.push(Explanation {
                        token: token.clone(),
                        concept: None,
                        label: label.to_string(),
                        sim: 0.0,
                        emoji: vec![symbol.to_string()],
                    });
                }
            }
        }

        debug!("Fallback-mapped {} tokens", mapped.len());
        (mapped, explanations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_match_scores_one() {
        let mapper =
            SimpleMapper::with_entries(vec![("عشق".to_string(), "❤️".to_string())]);

        let (mapped, explanations) = mapper.map("عشقم");

        assert_eq!(mapped, vec!["❤️"]);
        let e = &explanations[0];
        assert_eq!(e.token, "عشقم");
        assert_eq!(e.concept.as_deref(), Some("عشق"));
        assert_eq!(e.sim, 1.0);
    }

    #[test]
    fn first_entry_wins_on_multiple_containments() {
        // Token contains both دل and عشق; عشق is listed first
        let (mapped, explanations) = SimpleMapper::new().map("عشقدل");

        assert_eq!(mapped, vec!["❤️"]);
        assert_eq!(explanations[0].concept.as_deref(), Some("عشق"));
    }

    #[test]
    fn unmatched_short_token_is_connector() {
        let (mapped, explanations) = SimpleMapper::new().map("در");

        assert_eq!(mapped, vec![CONNECTOR_EMOJI]);
        assert_eq!(explanations[0].label, CONNECTOR_LABEL);
        assert_eq!(explanations[0].sim, 0.0);
    }

    #[test]
    fn unmatched_long_token_is_unknown() {
        let (mapped, explanations) = SimpleMapper::new().map("ناشناخته");

        assert_eq!(mapped, vec![UNKNOWN_EMOJI]);
        assert_eq!(explanations[0].label, UNKNOWN_LABEL);
    }

    #[test]
    fn maps_a_full_verse() {
        let (mapped, explanations) =
            SimpleMapper::new().map("بسی رنج بردم در این سال سی");

        assert_eq!(mapped.len(), 7);
        assert_eq!(explanations.len(), 7);
        // رنج and سال hit the dictionary
        assert_eq!(mapped[1], "💪");
        assert_eq!(mapped[5], "📅");
        // the two-char connector در degrades to a dot
        assert_eq!(mapped[3], CONNECTOR_EMOJI);
    }

    #[test]
    fn empty_input_maps_to_nothing() {
        let (mapped, explanations) = SimpleMapper::new().map("   ");
        assert!(mapped.is_empty());
        assert!(explanations.is_empty());
    }
}
