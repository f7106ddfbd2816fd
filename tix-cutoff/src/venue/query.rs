//! Venue text tokenization
//!
//! A [`VenueQuery`] is computed once per resolution and handed to every
//! stage, so no stage re-normalizes or re-splits the input.

use std::collections::HashSet;
use tix_common::text::normalize;

/// Shortest word looked up on its own in the city index
pub const MIN_CITY_WORD_LEN: usize = 3;

/// Shortest word sent to a geocoder on its own
pub const MIN_GEOCODE_WORD_LEN: usize = 4;

/// Normalized venue text split into the pieces the stages look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueQuery {
    pub normalized: String,
    /// Pieces between ',', '|' and free-standing dashes
    pub segments: Vec<String>,
    /// Whitespace tokens with leading/trailing punctuation removed
    pub words: Vec<String>,
}

impl VenueQuery {
    pub fn parse(text: &str) -> Self {
        let normalized = normalize(text);
        let segments = split_segments(&normalized);
        let words = normalized
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            normalized,
            segments,
            words,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Every run of `n` consecutive words, joined by single spaces
    pub fn ngrams(&self, n: usize) -> Vec<String> {
        if n == 0 || self.words.len() < n {
            return Vec::new();
        }
        self.words.windows(n).map(|w| w.join(" ")).collect()
    }

    /// Geocoder candidates, most specific first: full text, segments,
    /// 3-grams, 2-grams, then words of four or more characters.
    ///
    /// Duplicates are dropped, as are single words for which `skip`
    /// returns true.
    pub fn search_terms(&self, skip: impl Fn(&str) -> bool) -> Vec<String> {
        let words = self
            .words
            .iter()
            .filter(|w| w.chars().count() >= MIN_GEOCODE_WORD_LEN)
            .cloned();

        let candidates = std::iter::once(self.normalized.clone())
            .chain(self.segments.iter().cloned())
            .chain(self.ngrams(3))
            .chain(self.ngrams(2))
            .chain(words);

        let mut seen = HashSet::new();
        candidates
            .filter(|term| !term.is_empty())
            .filter(|term| term.contains(' ') || !skip(term))
            .filter(|term| seen.insert(term.clone()))
            .collect()
    }
}

/// Split on ',' and '|' anywhere, and on '-', '–' or '—' only when the dash
/// stands alone between spaces ("Winston-Salem" stays whole).
fn split_segments(normalized: &str) -> Vec<String> {
    let mut segments = Vec::new();
    for part in normalized.split(|c| c == ',' || c == '|') {
        let mut current: Vec<&str> = Vec::new();
        for token in part.split_whitespace() {
            if matches!(token, "-" | "–" | "—") {
                push_segment(&mut segments, &current);
                current.clear();
            } else {
                current.push(token);
            }
        }
        push_segment(&mut segments, &current);
    }
    segments
}

fn push_segment(segments: &mut Vec<String>, tokens: &[&str]) {
    if !tokens.is_empty() {
        segments.push(tokens.join(" "));
    }
}
