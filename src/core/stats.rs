use serde::{Serialize, Deserialize};

/// Document frequency of one term in one column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocWithFreq {
    pub term_str: String,
    pub field_id: u32,
    pub doc_freq: u64,
}

impl DocWithFreq {
    pub fn new(term_str: String, field_id: u32, doc_freq: u64) -> Self {
        DocWithFreq { term_str, field_id, doc_freq }
    }
}

/// Total token count of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldTokenNums {
    pub field_id: u32,
    pub field_total_tokens: u64,
}

impl FieldTokenNums {
    pub fn new(field_id: u32, field_total_tokens: u64) -> Self {
        FieldTokenNums { field_id, field_total_tokens }
    }
}

/// Corpus statistics merged from sibling index parts.
///
/// Each part reports its own `docs_freq`, `total_num_tokens` and
/// `total_num_docs`; the caller sums them and hands the result to every part
/// so that BM25 sees the rarity of a term across the whole logical corpus.
/// An empty `docs_freq` means "use local statistics".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub docs_freq: Vec<DocWithFreq>,
    pub total_num_tokens: Vec<FieldTokenNums>,
    pub total_num_docs: u64,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.docs_freq.is_empty()
    }

    /// Sum the statistics of several parts into one view.
    pub fn merge<'a, I>(parts: I) -> Statistics
    where
        I: IntoIterator<Item = &'a Statistics>,
    {
        let mut merged = Statistics::default();
        for part in parts {
            merged.docs_freq.extend(part.docs_freq.iter().cloned());
            for tokens in &part.total_num_tokens {
                match merged.total_num_tokens.iter_mut().find(|t| t.field_id == tokens.field_id) {
                    Some(existing) => existing.field_total_tokens += tokens.field_total_tokens,
                    None => merged.total_num_tokens.push(*tokens),
                }
            }
            merged.total_num_docs += part.total_num_docs;
        }
        merged
    }
}

/// Snapshot-level counters for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub segment_count: usize,
    pub total_documents: u64,
    pub deleted_documents: u64,
    pub max_row_id: Option<u64>,
}

impl IndexStats {
    pub fn live_documents(&self) -> u64 {
        self.total_documents.saturating_sub(self.deleted_documents)
    }
}
