//! Mapping history records and their on-disk store.
//!
//! One JSON file per successful mapping, named by timestamp. The record
//! carries everything needed to audit a mapping after the fact: the original
//! poem, the joined emoji output, the full explanation trail and which
//! engine produced it.

use crate::types::{EnginePath, Explanation, MapperError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One persisted record per successful mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub poem: String,
    /// Emoji sequence joined with single spaces.
    pub emoji: String,
    pub explanations: Vec<Explanation>,
    pub engine: EnginePath,
    pub created_at: DateTime<Local>,
}

impl MappingRecord {
    /// Build a record from a mapping result, stamped with the current time.
    pub fn new(
        poem: &str,
        mapped: &[String],
        explanations: Vec<Explanation>,
        engine: EnginePath,
    ) -> Self {
        Self {
            poem: poem.to_string(),
            emoji: mapped.join(" "),
            explanations,
            engine,
            created_at: Local::now(),
        }
    }
}

/// Appends mapping records as timestamped JSON files under one directory.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `record` to `<dir>/<YYYYmmdd_HHMMSS>.json`, creating the
    /// directory if needed. Returns the path written.
    pub fn append(&self, record: &MappingRecord) -> Result<PathBuf, MapperError> {
        fs::create_dir_all(&self.dir)?;
        let name = format!("{}.json", record.created_at.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        info!("Saved mapping record to {}", path.display());
        Ok(path)
    }
}
