/// Value types exchanged with the surrounding record service.
/// The JSON shapes match the knowledge-base file and the detection response.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Knowledge base record
// ---------------------------------------------------------------------------

/// One canonical clinical problem and the surface forms that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    /// Canonical display string, e.g. "Hypertension".
    pub term: String,
    /// Opaque classification label, e.g. "Diagnosis".
    pub category: String,
    /// Synonyms, abbreviations and casing variants.
    #[serde(default)]
    pub variations: Vec<String>,
}

impl KnowledgeBaseEntry {
    pub fn new<I, S>(term: impl Into<String>, category: impl Into<String>, variations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            term: term.into(),
            category: category.into(),
            variations: variations.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection result
// ---------------------------------------------------------------------------

/// A canonical problem found in a note. Serialises to `{"term": .., "category": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectedProblem {
    pub term: String,
    pub category: String,
}

impl DetectedProblem {
    pub fn new(term: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category: category.into(),
        }
    }
}
