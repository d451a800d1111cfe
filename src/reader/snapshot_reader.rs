use std::sync::Arc;
use roaring::RoaringTreemap;
use crate::core::error::Result;
use crate::core::stats::{DocWithFreq, FieldTokenNums, IndexStats, Statistics};
use crate::mvcc::controller::Snapshot;
use crate::query::ast::Query;
use crate::query::matcher::QueryEvaluator;
use crate::schema::schema::SchemaWithAnalyzer;
use crate::scoring::scorer::{CorpusStatistics, LocalStatistics};
use crate::search::bitmap;
use crate::search::executor::{Bm25Request, Bm25Searcher};
use crate::search::results::RowIdWithScore;

/// Reader pinned to one snapshot. Later commits and deletes are not seen
/// until a new reader is loaded.
pub struct IndexReader {
    pub snapshot: Arc<Snapshot>,
    pub schema: Arc<SchemaWithAnalyzer>,
}

impl IndexReader {
    pub fn new(snapshot: Arc<Snapshot>, schema: Arc<SchemaWithAnalyzer>) -> Self {
        IndexReader { snapshot, schema }
    }

    /// Matching row ids, tombstones excluded
    pub fn search(&self, query: &Query) -> Result<RoaringTreemap> {
        QueryEvaluator::new(&self.snapshot, &self.schema).evaluate(query)
    }

    /// Matching rows encoded against the snapshot universe
    pub fn search_bitmap(&self, query: &Query) -> Result<Vec<u8>> {
        let rows = self.search(query)?;
        bitmap::encode(&rows, self.snapshot.universe())
    }

    pub fn query_term_bitmap(&self, column: &str, term: &str) -> Result<Vec<u8>> {
        self.search_bitmap(&Query::term(column, term))
    }

    pub fn query_terms_bitmap(&self, column: &str, terms: &[String]) -> Result<Vec<u8>> {
        self.search_bitmap(&Query::terms(column, terms.iter().cloned()))
    }

    pub fn query_sentence_bitmap(&self, column: &str, sentence: &str) -> Result<Vec<u8>> {
        self.search_bitmap(&Query::sentence(column, sentence))
    }

    pub fn regex_term_bitmap(&self, column: &str, pattern: &str) -> Result<Vec<u8>> {
        self.search_bitmap(&Query::regex(column, pattern))
    }

    pub fn bm25_search(&self, request: &Bm25Request) -> Result<Vec<RowIdWithScore>> {
        Bm25Searcher::new(&self.snapshot, &self.schema).search(request)
    }

    /// Row-ordinal space result bitmaps are encoded against
    pub fn universe(&self) -> u64 {
        self.snapshot.universe()
    }

    pub fn indexed_doc_counts(&self) -> u64 {
        self.snapshot.live_doc_count()
    }

    /// Documents in the snapshot, tombstoned ones included until a merge
    /// drops them
    pub fn total_num_docs(&self) -> u64 {
        self.snapshot.doc_count()
    }

    pub fn total_num_tokens(&self) -> Vec<FieldTokenNums> {
        let local = self.local_statistics();
        self.schema.schema.columns.iter()
            .map(|c| FieldTokenNums::new(c.field_id.0, local.total_num_tokens(c.field_id)))
            .collect()
    }

    /// Document frequency of every token of `sentence` in every column
    pub fn doc_freq(&self, sentence: &str) -> Vec<DocWithFreq> {
        let local = self.local_statistics();
        let mut freqs: Vec<DocWithFreq> = Vec::new();

        for column in &self.schema.schema.columns {
            for token in self.schema.analyze(column.field_id, sentence) {
                let seen = freqs.iter()
                    .any(|f| f.field_id == column.field_id.0 && f.term_str == token.text);
                if !seen {
                    let doc_freq = local.doc_freq(&token.text, column.field_id);
                    freqs.push(DocWithFreq::new(token.text, column.field_id.0, doc_freq));
                }
            }
        }

        freqs
    }

    /// This index's share of the statistics for `sentence`, ready to be
    /// summed with sibling indexes through `Statistics::merge`
    pub fn statistics(&self, sentence: &str) -> Statistics {
        Statistics {
            docs_freq: self.doc_freq(sentence),
            total_num_tokens: self.total_num_tokens(),
            total_num_docs: self.total_num_docs(),
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot.stats()
    }

    fn local_statistics(&self) -> LocalStatistics<'_> {
        LocalStatistics::new(&self.snapshot, self.schema.schema.num_fields())
    }
}
