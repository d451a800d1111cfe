use std::collections::HashMap;
use crate::core::config::Bm25Params;
use crate::core::stats::Statistics;
use crate::core::types::FieldId;
use crate::mvcc::controller::Snapshot;

/// Corpus-level numbers BM25 needs
pub trait CorpusStatistics: Send + Sync {
    fn total_num_docs(&self) -> u64;

    fn total_num_tokens(&self, field: FieldId) -> u64;

    fn doc_freq(&self, term: &str, field: FieldId) -> u64;

    fn avg_field_len(&self, field: FieldId) -> f32 {
        let docs = self.total_num_docs();
        if docs == 0 {
            return 0.0;
        }
        self.total_num_tokens(field) as f32 / docs as f32
    }
}

/// Statistics of the committed segments of one snapshot
pub struct LocalStatistics<'a> {
    snapshot: &'a Snapshot,
    num_docs: u64,
    field_tokens: Vec<u64>,
}

impl<'a> LocalStatistics<'a> {
    pub fn new(snapshot: &'a Snapshot, num_fields: usize) -> Self {
        let mut field_tokens = vec![0u64; num_fields];
        for segment in &snapshot.segments {
            for (total, field) in field_tokens.iter_mut().zip(&segment.index.fields) {
                *total += field.total_tokens;
            }
        }

        LocalStatistics {
            snapshot,
            num_docs: snapshot.doc_count(),
            field_tokens,
        }
    }
}

impl CorpusStatistics for LocalStatistics<'_> {
    fn total_num_docs(&self) -> u64 {
        self.num_docs
    }

    fn total_num_tokens(&self, field: FieldId) -> u64 {
        self.field_tokens.get(field.as_usize()).copied().unwrap_or(0)
    }

    fn doc_freq(&self, term: &str, field: FieldId) -> u64 {
        self.snapshot.segments.iter()
            .filter_map(|segment| segment.index.field(field))
            .filter_map(|postings| postings.term(term))
            .map(|list| list.doc_freq() as u64)
            .sum()
    }
}

/// Statistics summed across sibling index parts, falling back to the local
/// values for any term or field the caller did not report
pub struct MergedStatistics<'a> {
    local: &'a dyn CorpusStatistics,
    num_docs: u64,
    field_tokens: HashMap<u32, u64>,
    doc_freqs: HashMap<(String, u32), u64>,
}

impl<'a> MergedStatistics<'a> {
    pub fn new(external: &Statistics, local: &'a dyn CorpusStatistics) -> Self {
        let mut doc_freqs = HashMap::new();
        for entry in &external.docs_freq {
            *doc_freqs.entry((entry.term_str.clone(), entry.field_id)).or_insert(0) += entry.doc_freq;
        }

        let mut field_tokens = HashMap::new();
        for entry in &external.total_num_tokens {
            *field_tokens.entry(entry.field_id).or_insert(0) += entry.field_total_tokens;
        }

        let num_docs = if external.total_num_docs > 0 {
            external.total_num_docs
        } else {
            local.total_num_docs()
        };

        MergedStatistics { local, num_docs, field_tokens, doc_freqs }
    }
}

impl CorpusStatistics for MergedStatistics<'_> {
    fn total_num_docs(&self) -> u64 {
        self.num_docs
    }

    fn total_num_tokens(&self, field: FieldId) -> u64 {
        match self.field_tokens.get(&field.0) {
            Some(&tokens) => tokens,
            None => self.local.total_num_tokens(field),
        }
    }

    fn doc_freq(&self, term: &str, field: FieldId) -> u64 {
        match self.doc_freqs.get(&(term.to_string(), field.0)) {
            Some(&freq) => freq,
            None => self.local.doc_freq(term, field),
        }
    }
}

/// BM25 weight of one term in one column
#[derive(Debug, Clone, Copy)]
pub struct Bm25Weight {
    pub idf: f32,
    pub k1: f32,
    pub b: f32,
    pub avg_doc_len: f32,
}

impl Bm25Weight {
    pub fn new(params: Bm25Params, doc_freq: u64, total_docs: u64, avg_doc_len: f32) -> Self {
        Bm25Weight {
            idf: idf(doc_freq, total_docs),
            k1: params.k1,
            b: params.b,
            avg_doc_len,
        }
    }

    pub fn for_term(
        params: Bm25Params,
        stats: &dyn CorpusStatistics,
        term: &str,
        field: FieldId,
    ) -> Self {
        Bm25Weight::new(
            params,
            stats.doc_freq(term, field),
            stats.total_num_docs(),
            stats.avg_field_len(field),
        )
    }

    pub fn score(&self, term_freq: u32, doc_len: u32) -> f32 {
        let tf = term_freq as f32;
        let avg_doc_len = if self.avg_doc_len > 0.0 { self.avg_doc_len } else { 1.0 };
        let norm = 1.0 - self.b + self.b * (doc_len as f32 / avg_doc_len);

        // BM25 formula
        let numerator = self.idf * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * norm;

        if denominator > 0.0 { numerator / denominator } else { 0.0 }
    }
}

/// Inverse document frequency, never negative
pub fn idf(doc_freq: u64, total_docs: u64) -> f32 {
    let n = doc_freq.min(total_docs) as f32;
    let total = total_docs as f32;
    (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
}
