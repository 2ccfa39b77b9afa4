//! Sentence embedding using Candle and paraphrase-multilingual-MiniLM-L12-v2
//!
//! This module loads the sentence-transformers multilingual MiniLM model and
//! computes 384-dimensional embeddings for text inputs. The model handles
//! Persian alongside 50+ other languages, which is what makes word-level
//! matching against a Persian concept bank work at all.
//!
//! MiniLM is a paraphrase/similarity model:
//! - Mean pooling over the attention mask (not CLS token pooling)
//! - Symmetric embedding: queries and targets embed identically
//! - Output is L2 normalized so cosine similarity is a plain dot product

use crate::types::MapperError;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

/// Model repository on HuggingFace Hub
pub const MODEL_REPO: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Local model directory checked before going to the hub
pub const LOCAL_MODEL_DIR: &str = "models/paraphrase-multilingual-MiniLM-L12-v2";

/// Embedding dimension
pub const EMBEDDING_DIM: usize = 384;

/// Text-to-vector seam consumed by the concept bank.
///
/// Implementations return one L2-normalized vector per input text, in input
/// order, and must be deterministic for a fixed model and input.
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts in one call.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MapperError>;

    /// Embedding dimension of this model.
    fn dim(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, MapperError> {
        let mut vecs = self.embed_batch(&[text])?;
        vecs.pop()
            .ok_or_else(|| MapperError::Embedding("empty embedding batch".into()))
    }
}

/// Sentence embedder backed by Candle's BERT implementation.
pub struct Embedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl Embedder {
    /// Create a new embedder.
    ///
    /// A local copy under [`LOCAL_MODEL_DIR`] is preferred; otherwise the
    /// model files are fetched from the hub and reused from the HuggingFace
    /// cache directory on later runs (first download is ~470MB).
    pub fn new() -> Result<Self, MapperError> {
        let local = Path::new(LOCAL_MODEL_DIR);
        if local.join("model.safetensors").exists() {
            info!("Loading embedding model from {}", local.display());
            return Self::from_files(
                local.join("config.json"),
                local.join("tokenizer.json"),
                local.join("model.safetensors"),
            );
        }
        Self::from_hub(MODEL_REPO)
    }

    /// Create an embedder by downloading a specific model from the hub.
    pub fn from_hub(model_name: &str) -> Result<Self, MapperError> {
        info!("Loading embedding model: {}", model_name);

        let api = Api::new()
            .map_err(|e| MapperError::ModelUnavailable(format!("hub api unavailable: {e}")))?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| MapperError::ModelUnavailable(format!("config.json: {e}")))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| MapperError::ModelUnavailable(format!("tokenizer.json: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| MapperError::ModelUnavailable(format!("model.safetensors: {e}")))?;

        debug!("Model files downloaded to cache");

        Self::from_files(config_path, tokenizer_path, weights_path)
    }

    /// Build the model from local config/tokenizer/weights files.
    pub fn from_files(
        config_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        weights_path: impl AsRef<Path>,
    ) -> Result<Self, MapperError> {
        let device = Device::Cpu; // CPU for portability

        let config: Config = serde_json::from_str(
            &std::fs::read_to_string(config_path.as_ref())
                .map_err(|e| MapperError::ModelUnavailable(format!("read config.json: {e}")))?,
        )
        .map_err(|e| MapperError::ModelUnavailable(format!("parse config.json: {e}")))?;

        debug!("Model config: hidden_size={}", config.hidden_size);

        let tokenizer = Tokenizer::from_file(tokenizer_path.as_ref())
            .map_err(|e| MapperError::ModelUnavailable(format!("load tokenizer: {e}")))?;

        let weights = weights_path.as_ref().to_path_buf();
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device)
                .map_err(|e| MapperError::ModelUnavailable(format!("load weights: {e}")))?
        };

        let model = BertModel::load(vb, &config)
            .map_err(|e| MapperError::ModelUnavailable(format!("build model: {e}")))?;

        info!("Embedding model loaded ({EMBEDDING_DIM}-dim, mean pooling)");

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Batch forward pass with mean pooling and L2 normalization.
    fn forward_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MapperError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| MapperError::Embedding(format!("tokenization failed: {e}")))?;

        self.pooled_embeddings(&encodings)
            .map_err(|e| MapperError::Embedding(e.to_string()))
    }

    /// Internal: pad, run the model, mean-pool over real tokens, normalize.
    fn pooled_embeddings(&self, encodings: &[Encoding]) -> candle_core::Result<Vec<Vec<f32>>> {
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut all_input_ids = Vec::new();
        let mut all_attention_mask = Vec::new();
        let mut all_token_type_ids = Vec::new();

        for encoding in encodings {
            let mut padded_ids = encoding.get_ids().to_vec();
            let mut padded_attention = encoding.get_attention_mask().to_vec();
            let mut padded_type_ids = encoding.get_type_ids().to_vec();

            padded_ids.resize(max_len, 0);
            padded_attention.resize(max_len, 0);
            padded_type_ids.resize(max_len, 0);

            all_input_ids.extend(padded_ids);
            all_attention_mask.extend(padded_attention);
            all_token_type_ids.extend(padded_type_ids);
        }

        let batch_size = encodings.len();

        let input_ids = Tensor::from_vec(all_input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(all_attention_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(all_token_type_ids, (batch_size, max_len), &self.device)?;

        // Forward pass: (batch_size, seq_len, hidden_size)
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens only: padding positions carry no
        // signal and must not dilute the sentence vector.
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = summed.broadcast_div(&counts)?;

        // L2 normalize so cosine similarity is a plain dot product
        let normalized = Self::l2_normalize(&mean)?;

        normalized.to_vec2::<f32>()
    }

    /// L2 normalize embeddings for cosine similarity
    fn l2_normalize(tensor: &Tensor) -> candle_core::Result<Tensor> {
        let norm = tensor
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        tensor.broadcast_div(&norm)
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        MODEL_REPO
    }
}

impl TextEmbedder for Embedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MapperError> {
        self.forward_batch(texts)
    }

    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }
}

static EMBEDDER: OnceCell<Arc<Embedder>> = OnceCell::new();

/// Process-wide embedder accessor.
///
/// The model is loaded at most once per process; every later call reuses the
/// loaded instance. A failed load is not cached, so a later call may retry
/// (e.g. after a transient network failure).
pub fn global_embedder() -> Result<Arc<Embedder>, MapperError> {
    EMBEDDER
        .get_or_try_init(|| Embedder::new().map(Arc::new))
        .cloned()
}
