//! Concept bank: loads concept definitions, builds one normalized vector per
//! concept, and answers nearest-concept queries by cosine similarity.
//!
//! The bank owns its concepts and their vectors as two positionally aligned
//! lists. Vectors are always derived from the concepts in a single batched
//! embedding call and rebuilt wholesale on any mutation; they are never
//! persisted. Mutation requires `&mut self`, so a reader can never observe a
//! concept list and a vector set out of alignment.

use crate::embedder::TextEmbedder;
use crate::types::{Concept, ConceptMatch, MapperError};
use crate::vector;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// In-memory concept collection with derived similarity vectors.
pub struct ConceptBank {
    embedder: Arc<dyn TextEmbedder>,
    data_path: PathBuf,
    concepts: Vec<Concept>,
    vectors: Vec<Vec<f32>>,
}

impl std::fmt::Debug for ConceptBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptBank")
            .field("data_path", &self.data_path)
            .field("concepts", &self.concepts)
            .field("vectors", &self.vectors)
            .finish_non_exhaustive()
    }
}

impl ConceptBank {
    /// Load a concept collection from `path` and build its vectors.
    ///
    /// Fails with [`MapperError::ConceptData`] when the file is missing or
    /// malformed: not a JSON array of concept records, a record missing
    /// `id`/`label`/`emoji`, an empty `emoji` list, or a duplicate `id`.
    pub fn load(
        path: impl AsRef<Path>,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self, MapperError> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|e| MapperError::ConceptData {
            path: path.display().to_string(),
            reason: format!("cannot read concept file: {e}"),
        })?;

        let concepts: Vec<Concept> =
            serde_json::from_str(&raw).map_err(|e| MapperError::ConceptData {
                path: path.display().to_string(),
                reason: format!("malformed concept collection: {e}"),
            })?;

        Self::validate(&concepts).map_err(|reason| MapperError::ConceptData {
            path: path.display().to_string(),
            reason,
        })?;

        let mut bank = Self {
            embedder,
            data_path: path.to_path_buf(),
            concepts,
            vectors: Vec::new(),
        };
        bank.build_vectors()?;

        info!(
            "Loaded {} concepts from {}",
            bank.concepts.len(),
            path.display()
        );
        Ok(bank)
    }

    fn validate(concepts: &[Concept]) -> Result<(), String> {
        let mut seen = HashSet::new();
        for c in concepts {
            if c.id.is_empty() {
                return Err("concept with empty id".into());
            }
            if c.label.is_empty() {
                return Err(format!("concept '{}' has an empty label", c.id));
            }
            if c.emoji.is_empty() {
                return Err(format!("concept '{}' has no emoji", c.id));
            }
            if !seen.insert(c.id.as_str()) {
                return Err(format!("duplicate concept id '{}'", c.id));
            }
        }
        Ok(())
    }

    /// Rebuild every concept vector from the current concept list.
    ///
    /// All concept texts go to the embedder in one batched call; each
    /// resulting vector is then renormalized independently. A bank with zero
    /// concepts gets an empty vector set and every query returns no matches.
    fn build_vectors(&mut self) -> Result<(), MapperError> {
        if self.concepts.is_empty() {
            self.vectors = Vec::new();
            return Ok(());
        }

        let texts: Vec<String> = self.concepts.iter().map(|c| c.embedding_text()).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let embedded = self.embedder.embed_batch(&refs)?;

        if embedded.len() != self.concepts.len() {
            return Err(MapperError::Embedding(format!(
                "expected {} vectors, got {}",
                self.concepts.len(),
                embedded.len()
            )));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = embedded.iter().find(|v| v.len() != dim) {
            return Err(MapperError::Embedding(format!(
                "expected {dim}-dim vectors, got {}",
                bad.len()
            )));
        }

        self.vectors = embedded.into_iter().map(vector::normalize).collect();
        debug!("Built {} concept vectors", self.vectors.len());
        Ok(())
    }

    /// Return up to `top_k` concepts ranked by descending cosine similarity
    /// to `text`.
    ///
    /// Ranking is stable: concepts with equal similarity keep their insertion
    /// order. An empty bank yields an empty result, never an error. A `top_k`
    /// beyond the concept count returns all concepts ranked.
    pub fn find_best(&self, text: &str, top_k: usize) -> Result<Vec<ConceptMatch>, MapperError> {
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let query = vector::normalize(self.embedder.embed(text)?);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, vector::cosine(&query, v)))
            .collect();
        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| ConceptMatch {
                concept: self.concepts[i].clone(),
                similarity,
            })
            .collect())
    }

    /// Append a concept and rebuild all vectors.
    ///
    /// The full rebuild keeps concepts and vectors index-aligned. O(bank
    /// size) per addition; additions are administrative, not per-request.
    pub fn add_concept(&mut self, concept: Concept) -> Result<(), MapperError> {
        if self.concepts.iter().any(|c| c.id == concept.id) {
            return Err(MapperError::ConceptData {
                path: self.data_path.display().to_string(),
                reason: format!("duplicate concept id '{}'", concept.id),
            });
        }
        Self::validate(std::slice::from_ref(&concept)).map_err(|reason| {
            MapperError::ConceptData {
                path: self.data_path.display().to_string(),
                reason,
            }
        })?;

        self.concepts.push(concept);
        if let Err(e) = self.build_vectors() {
            // A failed rebuild must not leave concepts and vectors misaligned
            self.concepts.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Persist the concept collection (never the vectors) as pretty JSON to
    /// `path`, or to the load path when `path` is `None`.
    pub fn save(&self, path: Option<&Path>) -> Result<(), MapperError> {
        let target = path.unwrap_or(&self.data_path);
        let json = serde_json::to_string_pretty(&self.concepts)?;
        std::fs::write(target, json)?;
        info!("Saved {} concepts to {}", self.concepts.len(), target.display());
        Ok(())
    }

    /// Re-read the load path and rebuild vectors.
    ///
    /// Either fully succeeds or leaves the bank exactly as it was.
    pub fn reload(&mut self) -> Result<(), MapperError> {
        let fresh = Self::load(&self.data_path, Arc::clone(&self.embedder))?;
        *self = fresh;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    #[cfg(test)]
    pub(crate) fn set_embedder_for_tests(&mut self, embedder: Arc<dyn TextEmbedder>) {
        self.embedder = embedder;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::testing::{FailingEmbedder, StubEmbedder};
    use crate::vector::l2_norm;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_concepts(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const THREE_CONCEPTS: &str = r#"[
        {"id": "love", "label": "عشق", "examples": ["love"], "emoji": ["❤️"]},
        {"id": "sea", "label": "دریا", "examples": ["sea"], "emoji": ["🌊"]},
        {"id": "moon", "label": "ماه", "examples": ["moon"], "emoji": ["🌙"]}
    ]"#;

    fn directional_stub() -> Arc<StubEmbedder> {
        Arc::new(StubEmbedder::with_fixed(
            4,
            &[
                ("love", &[1.0, 0.0, 0.0, 0.0]),
                ("sea", &[0.0, 1.0, 0.0, 0.0]),
                ("moon", &[0.0, 0.0, 1.0, 0.0]),
                // query leaning mostly toward "sea"
                ("wave", &[0.3, 0.9, 0.2, 0.0]),
            ],
        ))
    }

    #[test]
    fn load_builds_unit_norm_vectors() {
        let file = write_concepts(THREE_CONCEPTS);
        let bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();

        assert_eq!(bank.len(), 3);
        for v in &bank.vectors {
            assert!((l2_norm(v) - 1.0).abs() < 1e-6, "vector not unit norm");
        }
    }

    #[test]
    fn find_best_ranks_by_descending_similarity() {
        let file = write_concepts(THREE_CONCEPTS);
        let bank = ConceptBank::load(file.path(), directional_stub()).unwrap();

        let results = bank.find_best("wave", 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].concept.id, "sea");
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn find_best_clamps_top_k_to_bank_size() {
        let file = write_concepts(THREE_CONCEPTS);
        let bank = ConceptBank::load(file.path(), directional_stub()).unwrap();

        assert_eq!(bank.find_best("wave", 10).unwrap().len(), 3);
        assert_eq!(bank.find_best("wave", 2).unwrap().len(), 2);
    }

    #[test]
    fn find_best_equal_scores_keep_insertion_order() {
        let json = r#"[
            {"id": "first", "label": "a", "examples": ["same"], "emoji": ["🅰️"]},
            {"id": "second", "label": "b", "examples": ["same"], "emoji": ["🅱️"]}
        ]"#;
        let file = write_concepts(json);
        // Both concepts embed the identical text, so scores tie exactly
        let bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();

        let results = bank.find_best("same", 2).unwrap();
        assert_eq!(results[0].concept.id, "first");
        assert_eq!(results[1].concept.id, "second");
        assert!((results[0].similarity - results[1].similarity).abs() < 1e-9);
    }

    #[test]
    fn find_best_on_empty_bank_returns_empty() {
        let file = write_concepts("[]");
        let bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();

        assert!(bank.is_empty());
        assert!(bank.find_best("anything", 3).unwrap().is_empty());
    }

    #[test]
    fn save_load_round_trip_is_identical() {
        let file = write_concepts(THREE_CONCEPTS);
        let embedder: Arc<StubEmbedder> = Arc::new(StubEmbedder::new(8));
        let bank = ConceptBank::load(file.path(), embedder.clone()).unwrap();

        let out = NamedTempFile::new().unwrap();
        bank.save(Some(out.path())).unwrap();

        let reloaded = ConceptBank::load(out.path(), embedder).unwrap();
        assert_eq!(bank.concepts(), reloaded.concepts());
    }

    #[test]
    fn add_concept_ranks_its_own_example_first() {
        let file = write_concepts(THREE_CONCEPTS);
        let stub = Arc::new(StubEmbedder::with_fixed(
            4,
            &[
                ("love", &[1.0, 0.0, 0.0, 0.0]),
                ("sea", &[0.0, 1.0, 0.0, 0.0]),
                ("moon", &[0.0, 0.0, 1.0, 0.0]),
                ("mountain", &[0.0, 0.0, 0.0, 1.0]),
            ],
        ));
        let mut bank = ConceptBank::load(file.path(), stub).unwrap();

        bank.add_concept(Concept {
            id: "mountain".into(),
            label: "کوه".into(),
            examples: vec!["mountain".into()],
            emoji: vec!["⛰️".into()],
        })
        .unwrap();

        assert_eq!(bank.len(), 4);
        let results = bank.find_best("mountain", 1).unwrap();
        assert_eq!(results[0].concept.id, "mountain");
        assert!(results[0].similarity > 0.99);
    }

    #[test]
    fn add_concept_rejects_duplicate_id() {
        let file = write_concepts(THREE_CONCEPTS);
        let mut bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();

        let err = bank
            .add_concept(Concept {
                id: "love".into(),
                label: "عشق".into(),
                examples: vec![],
                emoji: vec!["❤️".into()],
            })
            .unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
        assert_eq!(bank.len(), 3);
    }

    #[test]
    fn failed_rebuild_keeps_concepts_and_vectors_aligned() {
        let file = write_concepts(THREE_CONCEPTS);
        let mut bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();

        // Swap in an embedder that always fails, then try to add
        bank.set_embedder_for_tests(Arc::new(FailingEmbedder));
        let err = bank
            .add_concept(Concept {
                id: "sun".into(),
                label: "خورشید".into(),
                examples: vec![],
                emoji: vec!["☀️".into()],
            })
            .unwrap_err();

        assert!(matches!(err, MapperError::Embedding(_)));
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.vectors.len(), 3);
    }

    #[test]
    fn missing_file_is_concept_data_error() {
        let err =
            ConceptBank::load("/nonexistent/concepts.json", Arc::new(StubEmbedder::new(8)))
                .unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
    }

    #[test]
    fn malformed_json_is_concept_data_error() {
        let file = write_concepts("{not json");
        let err = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
    }

    #[test]
    fn record_missing_label_is_concept_data_error() {
        let file = write_concepts(r#"[{"id": "love", "emoji": ["❤️"]}]"#);
        let err = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
    }

    #[test]
    fn empty_emoji_list_is_concept_data_error() {
        let file = write_concepts(r#"[{"id": "love", "label": "عشق", "emoji": []}]"#);
        let err = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
    }

    #[test]
    fn duplicate_id_is_concept_data_error() {
        let json = r#"[
            {"id": "love", "label": "a", "emoji": ["❤️"]},
            {"id": "love", "label": "b", "emoji": ["💓"]}
        ]"#;
        let file = write_concepts(json);
        let err = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap_err();
        assert!(matches!(err, MapperError::ConceptData { .. }));
    }

    #[test]
    fn reload_picks_up_changed_file() {
        let file = write_concepts(THREE_CONCEPTS);
        let mut bank = ConceptBank::load(file.path(), Arc::new(StubEmbedder::new(8))).unwrap();
        assert_eq!(bank.len(), 3);

        std::fs::write(
            file.path(),
            r#"[{"id": "sun", "label": "خورشید", "emoji": ["☀️"]}]"#,
        )
        .unwrap();
        bank.reload().unwrap();

        assert_eq!(bank.len(), 1);
        assert_eq!(bank.concepts()[0].id, "sun");
    }
}
