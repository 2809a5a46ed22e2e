//! Compiled engine snapshots and the versioned handle that serves them.
//!
//! A [`CompiledEngine`] is built completely before anyone can see it and never
//! changes afterwards. [`ProblemDetector`] holds the current snapshot behind a
//! lock that is only taken long enough to clone or replace an `Arc`, so scans
//! run lock-free against whichever snapshot they started with and a reload
//! never exposes a half-built matcher.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use clinscan_common::{DetectedProblem, EngineSettings};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::aggregate;
use crate::knowledge_base::KnowledgeBase;
use crate::trie_matcher::{MatchSpan, Matcher, PatternCompiler};
use crate::variation_index::VariationIndex;
use crate::{EngineError, Result};

/// Build statistics for one snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub version: u64,
    pub entry_count: usize,
    pub variation_count: usize,
    pub pattern_count: usize,
    pub conflict_count: usize,
    /// Entries per category.
    pub categories: BTreeMap<String, usize>,
}

/// An immutable (index, matcher) pair compiled from one knowledge base.
#[derive(Debug)]
pub struct CompiledEngine {
    index: VariationIndex,
    matcher: Matcher,
    settings: EngineSettings,
    stats: EngineStats,
}

impl CompiledEngine {
    /// Compile `kb`. The returned engine has version 0 until installed in a
    /// [`ProblemDetector`].
    pub fn build(kb: &KnowledgeBase, settings: EngineSettings) -> Result<Self> {
        validate_settings(&settings)?;
        let index = VariationIndex::build(kb);
        let matcher = PatternCompiler::compile(&index)?;

        let mut categories = BTreeMap::new();
        for entry in kb.entries() {
            *categories.entry(entry.category.clone()).or_insert(0) += 1;
        }

        let stats = EngineStats {
            version: 0,
            entry_count: kb.len(),
            variation_count: kb.variation_count(),
            pattern_count: matcher.pattern_count(),
            conflict_count: index.conflicts().len(),
            categories,
        };

        Ok(Self { index, matcher, settings, stats })
    }

    pub fn version(&self) -> u64 {
        self.stats.version
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Raw word-bounded spans for a note, before term deduplication.
    pub fn scan(&self, note: &str) -> Result<Vec<MatchSpan>> {
        self.check_length(note.len())?;
        Ok(self.matcher.scan(note))
    }

    /// Distinct canonical problems in order of first mention.
    pub fn detect(&self, note: &str) -> Result<Vec<DetectedProblem>> {
        let spans = self.scan(note)?;
        let problems = aggregate(&spans, &self.index)?;
        debug!(
            version = self.stats.version,
            spans = spans.len(),
            problems = problems.len(),
            "Note scanned"
        );
        Ok(problems)
    }

    /// Like [`detect`](Self::detect) for raw bytes, which must be UTF-8.
    pub fn detect_bytes(&self, note: &[u8]) -> Result<Vec<DetectedProblem>> {
        self.check_length(note.len())?;
        let note = std::str::from_utf8(note).map_err(|e| {
            EngineError::InvalidInput(format!("note is not valid UTF-8: {e}"))
        })?;
        self.detect(note)
    }

    /// Detect problems in many notes. Results keep the input order.
    /// Batches larger than `parallel_threshold` run on the rayon pool.
    pub fn detect_batch(&self, notes: &[&str]) -> Vec<Result<Vec<DetectedProblem>>> {
        #[cfg(feature = "parallel")]
        {
            let threshold = self.settings.parallel_threshold;
            if threshold > 0 && notes.len() > threshold {
                use rayon::prelude::*;
                return notes.par_iter()
                    .map(|note| self.detect(note))
                    .collect();
            }
        }
        notes.iter()
            .map(|note| self.detect(note))
            .collect()
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if len > self.settings.max_note_bytes {
            return Err(EngineError::InvalidInput(format!(
                "note is {len} bytes, limit is {}",
                self.settings.max_note_bytes
            )));
        }
        Ok(())
    }
}

/// Versioned handle to the current [`CompiledEngine`].
///
/// Starts empty; every scan fails with [`EngineError::NotReady`] until the
/// first successful [`reload`](Self::reload).
pub struct ProblemDetector {
    current: RwLock<Option<Arc<CompiledEngine>>>,
    settings: EngineSettings,
}

impl std::fmt::Debug for ProblemDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProblemDetector")
            .field("version", &self.version())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ProblemDetector {
    /// Create a detector with no compiled knowledge base.
    ///
    /// Fails with [`EngineError::Configuration`] for settings no snapshot
    /// could be built with.
    pub fn new(settings: EngineSettings) -> Result<Self> {
        validate_settings(&settings)?;
        Ok(Self {
            current: RwLock::new(None),
            settings,
        })
    }

    /// Create a detector and compile `kb` as version 1.
    pub fn with_knowledge_base(kb: KnowledgeBase, settings: EngineSettings) -> Result<Self> {
        let detector = Self::new(settings)?;
        detector.reload(&kb)?;
        Ok(detector)
    }

    /// Compile `kb` and swap it in. Returns the new version.
    ///
    /// On error the previously installed snapshot (if any) stays in place.
    pub fn reload(&self, kb: &KnowledgeBase) -> Result<u64> {
        let mut engine = match CompiledEngine::build(kb, self.settings.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                warn!("Knowledge base rebuild failed, keeping version {:?}: {}", self.version(), e);
                return Err(e);
            }
        };

        let pattern_count = engine.stats.pattern_count;
        let version = {
            let mut current = self.current.write();
            let version = current.as_ref().map_or(1, |e| e.version() + 1);
            engine.stats.version = version;
            *current = Some(Arc::new(engine));
            version
        };

        info!(
            "Problem detector ready: version {} ({} entries, {} patterns)",
            version,
            kb.len(),
            pattern_count
        );
        Ok(version)
    }

    /// Read a knowledge base file and swap it in.
    pub async fn reload_from_path(&self, path: impl AsRef<Path>) -> Result<u64> {
        let kb = match KnowledgeBase::load(path.as_ref()).await {
            Ok(kb) => kb,
            Err(e) => {
                warn!("Knowledge base load failed, keeping version {:?}: {}", self.version(), e);
                return Err(e);
            }
        };
        self.reload(&kb)
    }

    /// The snapshot new scans will use.
    pub fn snapshot(&self) -> Result<Arc<CompiledEngine>> {
        self.current.read().clone().ok_or(EngineError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|e| e.version())
    }

    pub fn scan(&self, note: &str) -> Result<Vec<MatchSpan>> {
        self.snapshot()?.scan(note)
    }

    pub fn detect(&self, note: &str) -> Result<Vec<DetectedProblem>> {
        self.snapshot()?.detect(note)
    }

    pub fn detect_bytes(&self, note: &[u8]) -> Result<Vec<DetectedProblem>> {
        self.snapshot()?.detect_bytes(note)
    }

    /// Every note in the batch is scanned against the same snapshot.
    pub fn detect_batch(&self, notes: &[&str]) -> Result<Vec<Result<Vec<DetectedProblem>>>> {
        Ok(self.snapshot()?.detect_batch(notes))
    }
}

/// A zero size limit would reject every note, including the empty one.
fn validate_settings(settings: &EngineSettings) -> Result<()> {
    if settings.max_note_bytes == 0 {
        return Err(EngineError::Configuration(
            "engine.max_note_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
