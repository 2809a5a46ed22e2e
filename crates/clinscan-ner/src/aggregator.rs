//! Resolve raw spans to canonical problems, one per term.

use ahash::AHashSet;
use clinscan_common::DetectedProblem;
use tracing::error;

use crate::trie_matcher::MatchSpan;
use crate::variation_index::VariationIndex;
use crate::{EngineError, Result};

/// Fold `spans` (in text order) into the distinct problems they name.
///
/// A term's position in the output is that of its first span; later spans for
/// the same term, through any variation, leave the first record untouched.
/// A span whose variation is missing from `index` means the matcher and index
/// were built from different knowledge bases and is reported as
/// [`EngineError::InternalConsistency`].
pub fn aggregate(spans: &[MatchSpan], index: &VariationIndex) -> Result<Vec<DetectedProblem>> {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut problems = Vec::new();

    for span in spans {
        let problem = index.lookup(&span.variation).ok_or_else(|| {
            error!(
                variation = %span.variation,
                start = span.start,
                end = span.end,
                "Matched variation missing from the variation index"
            );
            EngineError::InternalConsistency(format!(
                "variation '{}' at {}..{} is not in the variation index",
                span.variation, span.start, span.end
            ))
        })?;

        if seen.insert(problem.term.as_str()) {
            problems.push(problem.clone());
        }
    }

    Ok(problems)
}
