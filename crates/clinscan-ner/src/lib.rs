//! Clinical term recognition over free-text notes.
//!
//! Compiles a knowledge base of canonical problems and their variations into a
//! Aho-Corasick automata, scans notes for word-bounded, case-insensitive
//! occurrences and reports each canonical problem once, in order of first mention.
//!
//! ```rust,no_run
//! use clinscan_common::{EngineSettings, KnowledgeBaseEntry};
//! use clinscan_ner::{KnowledgeBase, ProblemDetector};
//!
//! # fn main() -> clinscan_ner::Result<()> {
//! let kb = KnowledgeBase::new(vec![
//!     KnowledgeBaseEntry::new("Hypertension", "Diagnosis", ["hypertension", "HTN"]),
//! ])?;
//! let detector = ProblemDetector::with_knowledge_base(kb, EngineSettings::default())?;
//! let problems = detector.detect("Pt with known HTN.")?;
//! assert_eq!(problems[0].term, "Hypertension");
//! # Ok(())
//! # }
//! ```

mod knowledge_base;
mod variation_index;
mod trie_matcher;
mod aggregator;
mod engine;

pub use knowledge_base::KnowledgeBase;
pub use variation_index::{VariationConflict, VariationIndex, normalize_variation};
pub use trie_matcher::{MatchSpan, Matcher, PatternCompiler};
pub use aggregator::aggregate;
pub use engine::{CompiledEngine, EngineStats, ProblemDetector};

pub use clinscan_common::{DetectedProblem, KnowledgeBaseEntry};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Engine not ready: no knowledge base has been compiled")]
    NotReady,

    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<aho_corasick::BuildError> for EngineError {
    fn from(e: aho_corasick::BuildError) -> Self {
        EngineError::Configuration(format!("failed to build pattern automaton: {e}"))
    }
}
