//! Character spans and text location helpers
//!
//! Spans are half-open byte ranges into the report text. Gold entities and
//! system mentions are located with the same search so their spans are
//! directly comparable.

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` byte range into a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// Collapse whitespace runs to single spaces and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First case-insensitive occurrence of `needle` in `haystack`
pub fn find_case_insensitive(haystack: &str, needle: &str) -> Option<Span> {
    find_case_insensitive_from(haystack, needle, 0)
}

/// First case-insensitive occurrence of `needle` starting at byte `from`
///
/// Returns `None` for an empty needle or when `from` is not a char boundary.
/// The returned span covers the matched bytes of `haystack`, which may differ
/// in length from `needle` when lowercasing changes the encoding width.
pub fn find_case_insensitive_from(haystack: &str, needle: &str, from: usize) -> Option<Span> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }

    let tail = haystack.get(from..)?;
    tail.char_indices().find_map(|(offset, _)| {
        match_len(&tail[offset..], &needle).map(|len| Span::new(from + offset, from + offset + len))
    })
}

/// Byte length of the prefix of `candidate` matching the lowercased `needle`
fn match_len(candidate: &str, needle: &[char]) -> Option<usize> {
    let mut matched = 0;

    for (idx, ch) in candidate.char_indices() {
        for lower in ch.to_lowercase() {
            if needle.get(matched) != Some(&lower) {
                return None;
            }
            matched += 1;
        }
        if matched == needle.len() {
            return Some(idx + ch.len_utf8());
        }
    }

    None
}
