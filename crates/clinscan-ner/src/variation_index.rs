//! Normalised variation → canonical problem lookup.

use ahash::AHashMap;
use clinscan_common::{DetectedProblem, KnowledgeBaseEntry};
use tracing::{info, warn};

use crate::knowledge_base::KnowledgeBase;
use crate::Result;

/// Fold a variation (or note text) to its matching key.
///
/// Folding is ASCII-only: `A-Z` become `a-z`, every other character is kept as
/// is. Byte offsets in the folded string therefore equal those in the source.
pub fn normalize_variation(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// A variation claimed by more than one knowledge base entry.
///
/// The later entry wins; the earlier owner is kept here for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationConflict {
    pub variation: String,
    pub previous: DetectedProblem,
    pub winner: DetectedProblem,
}

/// Lower-cased variation → `(term, category)`, plus the distinct variations in
/// first-registration order for the pattern compiler.
#[derive(Debug, Clone)]
pub struct VariationIndex {
    by_variation: AHashMap<String, DetectedProblem>,
    /// Distinct normalised variations, ordered by first appearance.
    patterns: Vec<String>,
    conflicts: Vec<VariationConflict>,
}

impl VariationIndex {
    /// Index every variation of `kb`. When a normalised variation is registered
    /// twice the last registration wins, but its pattern keeps the position of
    /// the first registration.
    pub fn build(kb: &KnowledgeBase) -> Self {
        let mut by_variation: AHashMap<String, DetectedProblem> =
            AHashMap::with_capacity(kb.variation_count());
        let mut patterns = Vec::with_capacity(kb.variation_count());
        let mut conflicts = Vec::new();

        for entry in kb.entries() {
            let owner = DetectedProblem::new(entry.term.clone(), entry.category.clone());

            for variation in &entry.variations {
                let key = normalize_variation(variation);

                match by_variation.insert(key.clone(), owner.clone()) {
                    None => patterns.push(key),
                    Some(previous) if previous != owner => {
                        warn!(
                            variation = %key,
                            previous_term = %previous.term,
                            winning_term = %owner.term,
                            "Knowledge base conflict: variation registered by multiple entries, last entry wins"
                        );
                        conflicts.push(VariationConflict {
                            variation: key,
                            previous,
                            winner: owner.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        info!(
            "Variation index built: {} variations, {} conflicts",
            patterns.len(),
            conflicts.len()
        );

        Self { by_variation, patterns, conflicts }
    }

    /// Validate `entries` and index them in one step.
    pub fn from_entries(entries: Vec<KnowledgeBaseEntry>) -> Result<Self> {
        let kb = KnowledgeBase::new(entries)?;
        Ok(Self::build(&kb))
    }

    /// Resolve a variation; the lookup key is normalised first.
    pub fn lookup(&self, variation: &str) -> Option<&DetectedProblem> {
        match self.by_variation.get(variation) {
            Some(problem) => Some(problem),
            None => self.by_variation.get(&normalize_variation(variation)),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn conflicts(&self) -> &[VariationConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
