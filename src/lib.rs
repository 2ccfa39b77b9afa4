//! Semantic Poem-to-Emoji Mapper
//!
//! Maps poem text, token by token, to representative emoji symbols by cosine
//! similarity against a curated bank of concepts.
//!
//! # Architecture
//!
//! ```text
//! Poem text
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Preprocess (normalize + tokenize)      │
//! │  "بسی رنج بردم" → [بسی, رنج, بردم]      │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  ConceptBank (multilingual MiniLM)      │
//! │  token → top-3 concepts + cosine scores │
//! └─────────────────────────────────────────┘
//!       │
//!       ├─── score ≥ threshold ───► concept emoji
//!       ├─── short token ─────────► "·"  (connector/stop)
//!       └─── otherwise ───────────► "❓" (unknown)
//!
//! Model unavailable?
//! ┌─────────────────────────────────────────┐
//! │  SimpleMapper (substring dictionary)    │
//! │  "عشقم" contains "عشق" → ❤️             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Every mapping yields an emoji sequence and a positionally aligned
//! explanation trail; both feed the optional on-disk mapping history.

pub mod bank;
pub mod embedder;
pub mod fallback;
pub mod history;
pub mod mapper;
pub mod preprocess;
pub mod types;
pub mod vector;

pub use bank::ConceptBank;
pub use embedder::{global_embedder, Embedder, TextEmbedder, EMBEDDING_DIM};
pub use fallback::SimpleMapper;
pub use history::{HistoryStore, MappingRecord};
pub use mapper::SemanticMapper;
pub use types::{Concept, ConceptMatch, EnginePath, Explanation, MapperConfig, MapperError};
