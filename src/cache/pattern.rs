//! Key Pattern Module
//!
//! Compiles `*`-wildcard invalidation patterns into a segment matcher.

use crate::error::{CacheError, Result};

// == Segment ==
/// One compiled piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal text that must appear verbatim
    Literal(String),
    /// `*` - matches any run of characters, including none
    Any,
}

// == Key Pattern ==
/// A compiled invalidation pattern.
///
/// `*` is the only metacharacter and matches any number of characters.
/// Patterns are compiled once and matched against every key, so
/// `invalidate("user:*")` walks the store with a pre-split segment list
/// instead of re-parsing the pattern per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    segments: Vec<Segment>,
}

impl KeyPattern {
    // == Compile ==
    /// Compiles a pattern string.
    ///
    /// Consecutive `*`s collapse into one wildcard. An empty pattern is
    /// rejected; it would match nothing while looking like "match all".
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CacheError::InvalidPattern(
                "pattern must not be empty".to_string(),
            ));
        }

        let mut segments = Vec::new();
        for (i, literal) in pattern.split('*').enumerate() {
            if i > 0 && !matches!(segments.last(), Some(Segment::Any)) {
                segments.push(Segment::Any);
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(literal.to_string()));
            }
        }

        Ok(Self { segments })
    }

    // == Matches ==
    /// Checks whether a key matches the compiled pattern.
    ///
    /// Literal segments anchor at the start and end of the key; middle
    /// literals match leftmost-first, which is exact for patterns whose
    /// only wildcard is `*`.
    pub fn matches(&self, key: &str) -> bool {
        let segments = &self.segments;
        let last = segments.len() - 1;
        let mut pos = 0;

        for (idx, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Any => {}
                Segment::Literal(lit) => {
                    if idx == 0 {
                        if !key.starts_with(lit.as_str()) {
                            return false;
                        }
                        pos = lit.len();
                    } else if idx == last {
                        let tail = &key[pos..];
                        if tail.len() < lit.len() || !tail.ends_with(lit.as_str()) {
                            return false;
                        }
                        pos = key.len();
                    } else {
                        match key[pos..].find(lit.as_str()) {
                            Some(found) => pos += found + lit.len(),
                            None => return false,
                        }
                    }
                }
            }
        }

        // A trailing wildcard swallows the rest; a trailing literal must
        // have consumed the key exactly.
        matches!(segments.last(), Some(Segment::Any)) || pos == key.len()
    }
}
