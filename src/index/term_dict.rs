use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use regex::Regex;
use crate::core::error::{Error, Result};

/// Sorted term dictionary of one column of one segment.
///
/// Maps every term to its ordinal, which indexes the column's posting lists.
pub struct TermDictionary {
    fst: Map<Vec<u8>>,
}

impl TermDictionary {
    /// Build from terms already sorted in byte order
    pub fn build<'a, I>(sorted_terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut builder = MapBuilder::memory();
        for (ordinal, term) in sorted_terms.into_iter().enumerate() {
            builder.insert(term.as_bytes(), ordinal as u64)?;
        }
        let bytes = builder.into_inner()?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let fst = Map::new(bytes)
            .map_err(|e| Error::corrupted(format!("invalid term dictionary: {}", e)))?;
        Ok(TermDictionary { fst })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.fst.as_fst().as_bytes()
    }

    pub fn get(&self, term: &str) -> Option<usize> {
        self.fst.get(term.as_bytes()).map(|ordinal| ordinal as usize)
    }

    pub fn len(&self) -> usize {
        self.fst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    /// Ordinals of every term the regex matches in full
    pub fn search_regex(&self, regex: &Regex) -> Vec<usize> {
        let mut ordinals = Vec::new();
        let mut stream = self.fst.stream();

        while let Some((term_bytes, ordinal)) = stream.next() {
            if let Ok(term) = std::str::from_utf8(term_bytes) {
                if regex.is_match(term) {
                    ordinals.push(ordinal as usize);
                }
            }
        }

        ordinals
    }

    /// (term, ordinal) pairs in sorted order
    pub fn terms(&self) -> Vec<(String, usize)> {
        let mut terms = Vec::with_capacity(self.len());
        let mut stream = self.fst.range().into_stream();

        while let Some((term_bytes, ordinal)) = stream.next() {
            terms.push((String::from_utf8_lossy(term_bytes).into_owned(), ordinal as usize));
        }

        terms
    }
}

/// Anchor a user pattern so it has to match an entire term. The pattern is
/// compiled alone first: wrapping can balance stray parentheses.
pub fn full_term_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)?;
    Ok(Regex::new(&format!("^(?:{})$", pattern))?)
}
