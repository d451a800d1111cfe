use std::collections::HashMap;
use rayon::prelude::*;
use tracing::debug;
use crate::analysis::filter::{StopWordFilter, TokenFilter};
use crate::analysis::tokenizer::Token;
use crate::core::error::Result;
use crate::core::stats::Statistics;
use crate::core::types::{DocId, FieldId};
use crate::mvcc::controller::Snapshot;
use crate::schema::schema::SchemaWithAnalyzer;
use crate::scoring::scorer::{Bm25Weight, CorpusStatistics, LocalStatistics, MergedStatistics};
use crate::search::bitmap::AliveFilter;
use crate::search::results::{RowIdWithScore, TopKCollector};
use crate::storage::segment::Segment;

/// Parameters of one ranked search
#[derive(Debug, Clone)]
pub struct Bm25Request {
    pub text: String,
    pub columns: Vec<String>,     // Empty means every column
    pub top_k: usize,
    pub alive_filter: AliveFilter,
    pub natural_language: bool,   // Drop stop words, always OR
    pub operator_or: bool,
    pub statistics: Statistics,   // Empty means local statistics
    pub need_doc: bool,           // Report matched terms per hit
}

impl Bm25Request {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Bm25Request {
            text: text.into(),
            columns: Vec::new(),
            top_k,
            alive_filter: AliveFilter::All,
            natural_language: false,
            operator_or: true,
            statistics: Statistics::default(),
            need_doc: false,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_alive_filter(mut self, alive_filter: AliveFilter) -> Self {
        self.alive_filter = alive_filter;
        self
    }

    pub fn with_natural_language(mut self, natural_language: bool) -> Self {
        self.natural_language = natural_language;
        self
    }

    pub fn with_operator_or(mut self, operator_or: bool) -> Self {
        self.operator_or = operator_or;
        self
    }

    pub fn with_statistics(mut self, statistics: Statistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_need_doc(mut self, need_doc: bool) -> Self {
        self.need_doc = need_doc;
        self
    }

    /// Natural-language mode overrides the requested operator
    pub fn uses_or(&self) -> bool {
        self.natural_language || self.operator_or
    }
}

/// One query term in one column
struct WeightedTerm {
    field: FieldId,
    term: String,
    group: usize,  // Query token position the term came from
    weight: Bm25Weight,
}

/// Accumulated score of one document in one segment
struct DocHit {
    score: f32,
    groups: Vec<bool>,
    terms: Vec<String>,
}

/// Ranks rows of one snapshot with BM25
pub struct Bm25Searcher<'a> {
    snapshot: &'a Snapshot,
    schema: &'a SchemaWithAnalyzer,
}

impl<'a> Bm25Searcher<'a> {
    pub fn new(snapshot: &'a Snapshot, schema: &'a SchemaWithAnalyzer) -> Self {
        Bm25Searcher { snapshot, schema }
    }

    pub fn search(&self, request: &Bm25Request) -> Result<Vec<RowIdWithScore>> {
        let fields = self.schema.resolve_columns(&request.columns)?;
        if request.top_k == 0 || request.alive_filter.is_empty() {
            return Ok(Vec::new());
        }

        let local = LocalStatistics::new(self.snapshot, self.schema.schema.num_fields());
        let merged;
        let stats: &dyn CorpusStatistics = if request.statistics.is_empty() {
            &local
        } else {
            merged = MergedStatistics::new(&request.statistics, &local);
            &merged
        };

        let (terms, group_count) = self.query_terms(request, &fields, stats);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let require_all = !request.uses_or();
        let collector = self.snapshot.segments
            .par_iter()
            .map(|segment| self.score_segment(segment, &terms, group_count, require_all, request))
            .reduce(
                || TopKCollector::new(request.top_k),
                |mut a, b| {
                    a.merge(b);
                    a
                },
            );

        debug!(
            terms = terms.len(),
            candidates = collector.total_collected,
            top_k = request.top_k,
            "bm25 search"
        );
        Ok(collector.into_sorted_vec())
    }

    /// Analyze the query for every column and weight each distinct term
    fn query_terms(
        &self,
        request: &Bm25Request,
        fields: &[FieldId],
        stats: &dyn CorpusStatistics,
    ) -> (Vec<WeightedTerm>, usize) {
        let mut groups: HashMap<u32, usize> = HashMap::new();
        let mut terms: Vec<WeightedTerm> = Vec::new();

        for &field in fields {
            let mut tokens = self.schema.analyze(field, &request.text);
            if request.natural_language {
                tokens = drop_stop_words(tokens);
            }

            let params = self.schema.schema.column(field)
                .map(|c| c.parameter.bm25())
                .unwrap_or_default();

            for token in tokens {
                if terms.iter().any(|t| t.field == field && t.term == token.text) {
                    continue;
                }
                let next_group = groups.len();
                let group = *groups.entry(token.position).or_insert(next_group);
                terms.push(WeightedTerm {
                    field,
                    weight: Bm25Weight::for_term(params, stats, &token.text, field),
                    term: token.text,
                    group,
                });
            }
        }

        (terms, groups.len())
    }

    fn score_segment(
        &self,
        segment: &Segment,
        terms: &[WeightedTerm],
        group_count: usize,
        require_all: bool,
        request: &Bm25Request,
    ) -> TopKCollector {
        let mut hits: HashMap<DocId, DocHit> = HashMap::new();

        for term in terms {
            let Some(postings) = segment.index.field(term.field) else {
                continue;
            };
            let Some(list) = postings.term(&term.term) else {
                continue;
            };

            for posting in &list.postings {
                let row_id = segment.index.row_id(posting.doc_id);
                if self.snapshot.is_deleted(row_id) || !request.alive_filter.allows(row_id.0) {
                    continue;
                }

                let hit = hits.entry(posting.doc_id).or_insert_with(|| DocHit {
                    score: 0.0,
                    groups: vec![false; group_count],
                    terms: Vec::new(),
                });
                hit.score += term.weight.score(posting.term_freq, postings.doc_length(posting.doc_id));
                hit.groups[term.group] = true;
                if request.need_doc && !hit.terms.contains(&term.term) {
                    hit.terms.push(term.term.clone());
                }
            }
        }

        let mut collector = TopKCollector::new(request.top_k);
        for (doc_id, hit) in hits {
            if require_all && !hit.groups.iter().all(|&matched| matched) {
                continue;
            }
            collector.collect(RowIdWithScore {
                row_id: segment.index.row_id(doc_id).0,
                score: hit.score,
                seg_id: segment.id().0,
                doc_id,
                docs: hit.terms,
            });
        }
        collector
    }
}

/// Remove English stop words unless nothing would be left
fn drop_stop_words(tokens: Vec<Token>) -> Vec<Token> {
    let stop_words = StopWordFilter::english();
    if tokens.iter().all(|t| stop_words.is_stop_word(&t.text)) {
        return tokens;
    }
    stop_words.filter(tokens)
}
