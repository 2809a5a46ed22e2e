//! Word-bounded, case-insensitive multi-pattern scanning.
//!
//! All distinct variations are compiled into Aho-Corasick automata and the note
//! is searched left to right the way an alternation search over
//! `\b(v1|v2|...)\b` would:
//!
//! - the leftmost start position with a word-bounded candidate wins;
//! - at that position the variation registered first wins, even when a later
//!   one is longer ("diabetes" beats "diabetes mellitus" if registered first);
//! - the next search starts where the emitted match ends.
//!
//! Reordering this to longest-match would change which canonical terms callers
//! receive.

use aho_corasick::{AhoCorasick, Anchored, Input, Match, MatchKind, StartKind};
use tracing::{debug, info};

use crate::variation_index::VariationIndex;
use crate::Result;

/// One resolved occurrence of a variation in a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    /// The normalised variation that matched.
    pub variation: String,
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset one past the last matched byte.
    pub end: usize,
}

impl MatchSpan {
    /// The matched slice of the note as it was written.
    pub fn surface<'a>(&self, note: &'a str) -> Option<&'a str> {
        note.get(self.start..self.end)
    }
}

/// Builds a [`Matcher`] from the patterns of a [`VariationIndex`].
pub struct PatternCompiler;

impl PatternCompiler {
    pub fn compile(index: &VariationIndex) -> Result<Matcher> {
        Matcher::new(index.patterns().to_vec())
    }
}

/// Immutable compiled automata. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// Leftmost start, earliest-registered pattern on ties.
    leftmost: AhoCorasick,
    /// Every pattern occurring at one fixed start. Only consulted when the
    /// leftmost-first winner fails its right boundary.
    anchored: AhoCorasick,
    /// Pattern id → normalised variation. Ids follow registration order.
    patterns: Vec<String>,
}

impl Matcher {
    /// Compile `patterns` (already normalised, in priority order).
    pub fn new(patterns: Vec<String>) -> Result<Self> {
        let leftmost = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .ascii_case_insensitive(true)
            .build(&patterns)?;

        let anchored = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .start_kind(StartKind::Anchored)
            .ascii_case_insensitive(true)
            .build(&patterns)?;

        info!("Pattern automaton compiled: {} patterns", patterns.len());

        Ok(Self { leftmost, anchored, patterns })
    }

    /// Scan a note and return non-overlapping spans in text order.
    ///
    /// Time complexity: O(n * l) worst case, where n = note length and
    /// l = longest variation; independent of how many variations nest.
    /// Nothing beyond the emitted spans is buffered.
    pub fn scan(&self, note: &str) -> Vec<MatchSpan> {
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos < note.len() {
            let Some(first) = self.leftmost.find(Input::new(note).range(pos..)) else {
                break;
            };

            match self.resolve_at(note, first) {
                Some(mat) => {
                    spans.push(MatchSpan {
                        variation: self.patterns[mat.pattern().as_usize()].clone(),
                        start: mat.start(),
                        end: mat.end(),
                    });
                    pos = mat.end();
                }
                None => pos = next_char_start(note, first.start()),
            }
        }

        debug!("Scanned {} bytes: {} spans", note.len(), spans.len());
        spans
    }

    /// Pick the word-bounded variation at `first.start()`, preferring the
    /// earliest-registered one. `first` is the leftmost-first winner there.
    fn resolve_at(&self, note: &str, first: Match) -> Option<Match> {
        if !is_left_bounded(note, first.start()) {
            return None;
        }
        if is_right_bounded(note, first.end()) {
            return Some(first);
        }

        // Distinct patterns sharing a start have distinct lengths, so at most
        // l candidates are visited here.
        let input = Input::new(note)
            .range(first.start()..)
            .anchored(Anchored::Yes);
        self.anchored
            .find_overlapping_iter(input)
            .filter(|mat| mat.pattern() != first.pattern() && is_right_bounded(note, mat.end()))
            .min_by_key(|mat| mat.pattern())
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

/// Word characters are alphanumerics (Unicode) and underscore.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The character before `start` is absent or not a word character.
fn is_left_bounded(note: &str, start: usize) -> bool {
    let before = note.get(..start).and_then(|s| s.chars().next_back());
    !before.is_some_and(is_word_char)
}

/// The character at `end` is absent or not a word character.
fn is_right_bounded(note: &str, end: usize) -> bool {
    let after = note.get(end..).and_then(|s| s.chars().next());
    !after.is_some_and(is_word_char)
}

fn next_char_start(note: &str, start: usize) -> usize {
    start + note.get(start..).and_then(|s| s.chars().next()).map_or(1, char::len_utf8)
}
