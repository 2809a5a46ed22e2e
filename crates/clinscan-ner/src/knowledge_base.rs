//! Validated, immutable knowledge base of canonical clinical problems.
//!
//! Accepts the record shape of `problems_kb.json`:
//! `[{"term": "...", "category": "...", "variations": ["...", ...]}, ...]`.
//! Loading is the only I/O the engine performs and happens before compilation.

use std::path::Path;

use clinscan_common::KnowledgeBaseEntry;
use tracing::{debug, info};

use crate::{EngineError, Result};

/// Knowledge base entries in registration order.
///
/// Construction validates every entry, so a `KnowledgeBase` value is always
/// compilable.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeBaseEntry>,
}

impl KnowledgeBase {
    /// Validate `entries` and wrap them.
    ///
    /// Fails with [`EngineError::Configuration`] when the list is empty, when an
    /// entry has an empty term, category or variation list, or when a variation
    /// is blank.
    pub fn new(entries: Vec<KnowledgeBaseEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(EngineError::Configuration(
                "knowledge base contains no entries".to_string(),
            ));
        }

        for (position, entry) in entries.iter().enumerate() {
            validate_entry(position, entry)?;
        }

        debug!("Validated knowledge base with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Parse a JSON array of entries.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<KnowledgeBaseEntry> = serde_json::from_str(json).map_err(|e| {
            EngineError::Configuration(format!("invalid knowledge base JSON: {e}"))
        })?;
        Self::new(entries)
    }

    /// Read and parse a knowledge base file (blocking).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
        let kb = Self::from_json_str(&content)?;
        info!("Loaded {} knowledge base entries from {}", kb.len(), path.display());
        Ok(kb)
    }

    /// Read and parse a knowledge base file on the tokio runtime.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| read_error(path, e))?;
        let kb = Self::from_json_str(&content)?;
        info!("Loaded {} knowledge base entries from {}", kb.len(), path.display());
        Ok(kb)
    }

    pub fn entries(&self) -> &[KnowledgeBaseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed knowledge base.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of variation strings across all entries, duplicates included.
    pub fn variation_count(&self) -> usize {
        self.entries.iter().map(|e| e.variations.len()).sum()
    }
}

fn validate_entry(position: usize, entry: &KnowledgeBaseEntry) -> Result<()> {
    if entry.term.trim().is_empty() {
        return Err(EngineError::Configuration(format!(
            "entry #{position} has an empty term"
        )));
    }
    if entry.category.trim().is_empty() {
        return Err(EngineError::Configuration(format!(
            "entry #{position} ({}) has an empty category",
            entry.term
        )));
    }
    if entry.variations.is_empty() {
        return Err(EngineError::Configuration(format!(
            "entry #{position} ({}) has no variations and can never be detected",
            entry.term
        )));
    }
    if let Some(index) = entry.variations.iter().position(|v| v.trim().is_empty()) {
        return Err(EngineError::Configuration(format!(
            "entry #{position} ({}) has a blank variation at index {index}",
            entry.term
        )));
    }
    Ok(())
}

fn read_error(path: &Path, e: std::io::Error) -> EngineError {
    EngineError::Configuration(format!(
        "failed to read knowledge base {}: {e}",
        path.display()
    ))
}
