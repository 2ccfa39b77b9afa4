//! Core types for the poem-to-emoji mapping engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named semantic cluster with example phrases and associated emoji.
///
/// Concepts are loaded from a JSON collection and owned by the
/// [`ConceptBank`](crate::bank::ConceptBank). Every concept carries at least
/// one emoji after validation; `examples` may be empty, in which case the
/// label stands in as the sole example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identity within the bank.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Example phrases defining the cluster.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Associated emoji; the first one is emitted on a match.
    pub emoji: Vec<String>,
}

impl Concept {
    /// Text embedded for this concept: examples joined with `" . "`,
    /// falling back to the label when no examples are given.
    pub fn embedding_text(&self) -> String {
        if self.examples.is_empty() {
            self.label.clone()
        } else {
            self.examples.join(" . ")
        }
    }
}

/// One ranked nearest-concept result.
#[derive(Debug, Clone)]
pub struct ConceptMatch {
    pub concept: Concept,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

/// Per-token audit record returned alongside the emoji sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub token: String,
    /// Matched concept id, or `None` for placeholder tokens.
    pub concept: Option<String>,
    pub label: String,
    pub sim: f32,
    /// Full emoji list of the matched concept, or the placeholder symbol.
    pub emoji: Vec<String>,
}

/// Which engine produced a mapping result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePath {
    /// Full semantic pipeline with a preloaded embedding model.
    Semantic,
    /// Semantic pipeline where the mapper brought the model up itself.
    MapperNoModel,
    /// Dictionary substring fallback.
    FallbackSimple,
}

impl EnginePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnginePath::Semantic => "semantic",
            EnginePath::MapperNoModel => "mapper_no_model",
            EnginePath::FallbackSimple => "fallback_simple",
        }
    }
}

/// Tuning knobs for the semantic mapper.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Minimum cosine similarity for a concept match.
    pub similarity_threshold: f32,
    /// Number of candidates requested per token.
    pub top_k: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.52,
            top_k: 3,
        }
    }
}

/// Errors surfaced by the mapping engine.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The embedding model could not be loaded.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// The concept collection is missing or malformed.
    #[error("concept data error in {path}: {reason}")]
    ConceptData { path: String, reason: String },

    /// An embedding call failed on valid input. Non-fatal per token.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
