use roaring::RoaringTreemap;
use crate::core::error::Result;
use crate::core::types::{DocId, FieldId};
use crate::index::inverted::FieldPostings;
use crate::index::posting::PostingList;
use crate::index::term_dict::full_term_regex;
use crate::mvcc::controller::Snapshot;
use crate::query::ast::Query;
use crate::schema::schema::SchemaWithAnalyzer;
use crate::storage::segment::Segment;

/// Evaluates row-set queries against one snapshot
pub struct QueryEvaluator<'a> {
    snapshot: &'a Snapshot,
    schema: &'a SchemaWithAnalyzer,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(snapshot: &'a Snapshot, schema: &'a SchemaWithAnalyzer) -> Self {
        QueryEvaluator { snapshot, schema }
    }

    /// Row ids matching `query`, tombstoned rows excluded
    pub fn evaluate(&self, query: &Query) -> Result<RoaringTreemap> {
        let field = self.schema.schema.field_id(query.column())?;

        let mut rows = match query {
            Query::Term(q) => self.collect_rows(field, |postings, rows| {
                if let Some(list) = postings.term(&q.term) {
                    rows.push(list);
                }
            }),

            Query::Terms(q) => self.collect_rows(field, |postings, rows| {
                rows.extend(q.terms.iter().filter_map(|term| postings.term(term)));
            }),

            Query::Sentence(q) => self.evaluate_sentence(field, &q.sentence),

            Query::Regex(q) => {
                let regex = full_term_regex(&q.pattern)?;
                self.collect_rows(field, |postings, rows| {
                    for ordinal in postings.dictionary.search_regex(&regex) {
                        if let Some(list) = postings.postings.get(ordinal) {
                            rows.push(list);
                        }
                    }
                })
            }
        };

        rows -= self.snapshot.deleted_rows.as_ref();
        Ok(rows)
    }

    /// Union of the posting lists `select` picks in every segment
    fn collect_rows<F>(&self, field: FieldId, select: F) -> RoaringTreemap
    where
        F: for<'p> Fn(&'p FieldPostings, &mut Vec<&'p PostingList>),
    {
        let mut rows = RoaringTreemap::new();
        for segment in &self.snapshot.segments {
            let Some(postings) = segment.index.field(field) else {
                continue;
            };
            let mut lists = Vec::new();
            select(postings, &mut lists);
            for list in lists {
                rows.extend(list.doc_ids().map(|doc_id| segment.index.row_id(doc_id).0));
            }
        }
        rows
    }

    fn evaluate_sentence(&self, field: FieldId, sentence: &str) -> RoaringTreemap {
        let tokens = self.schema.analyze(field, sentence);
        let mut rows = RoaringTreemap::new();
        if tokens.is_empty() {
            return rows;
        }

        // Positions relative to the first query token; stop words removed by
        // the analyzer leave gaps that the document must reproduce
        let first = tokens[0].position;
        let phrase: Vec<(&str, u32)> = tokens.iter()
            .map(|t| (t.text.as_str(), t.position - first))
            .collect();

        for segment in &self.snapshot.segments {
            for doc_id in phrase_matches(segment, field, &phrase) {
                rows.insert(segment.index.row_id(doc_id).0);
            }
        }
        rows
    }
}

/// Docs of `segment` where every phrase term occurs at its relative offset
fn phrase_matches(segment: &Segment, field: FieldId, phrase: &[(&str, u32)]) -> Vec<DocId> {
    let Some(postings) = segment.index.field(field) else {
        return Vec::new();
    };

    let mut lists = Vec::with_capacity(phrase.len());
    for (term, _) in phrase {
        match postings.term(term) {
            Some(list) => lists.push(list),
            None => return Vec::new(),
        }
    }

    // Start from the rarest term
    let mut candidates: Vec<DocId> = lists.iter()
        .min_by_key(|list| list.len())
        .map(|list| list.doc_ids().collect())
        .unwrap_or_default();
    for list in &lists {
        candidates.retain(|doc_id| list.get(*doc_id).is_some());
    }

    candidates.into_iter()
        .filter(|&doc_id| {
            let Some(anchor) = lists[0].get(doc_id) else {
                return false;
            };
            anchor.positions.iter().any(|&start| {
                phrase.iter().zip(&lists).skip(1).all(|((_, offset), list)| {
                    list.get(doc_id).is_some_and(|p| p.has_position(start + offset))
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::Utc;
    use crate::core::config::IndexParameter;
    use crate::core::error::ErrorKind;
    use crate::core::types::RowId;
    use crate::index::inverted::{InvertedIndex, SegmentIndex};
    use crate::schema::schema::IndexSchema;
    use crate::storage::segment::{SegmentId, SegmentMeta};

    fn schema() -> SchemaWithAnalyzer {
        let columns = vec!["title".to_string(), "body".to_string()];
        let schema = IndexSchema::new(&columns, &IndexParameter::default()).unwrap();
        SchemaWithAnalyzer::new(schema).unwrap()
    }

    fn snapshot(schema: &SchemaWithAnalyzer, docs: &[(u64, &str, &str)]) -> Snapshot {
        let mut buffer = InvertedIndex::new(2);
        for (row_id, title, body) in docs {
            buffer.add_document(RowId(*row_id), vec![
                schema.analyze(FieldId(0), title),
                schema.analyze(FieldId(1), body),
            ]);
        }
        let stored = buffer.to_stored().unwrap();
        let meta = SegmentMeta {
            id: SegmentId(0),
            doc_count: docs.len() as u32,
            size_bytes: 0,
            min_row_id: docs.iter().map(|d| RowId(d.0)).min(),
            max_row_id: docs.iter().map(|d| RowId(d.0)).max(),
            created_at: Utc::now(),
        };
        let segment = Segment { meta, index: SegmentIndex::from_stored(stored, 2).unwrap() };
        Snapshot { segments: vec![Arc::new(segment)], ..Snapshot::default() }
    }

    fn rows(set: RoaringTreemap) -> Vec<u64> {
        set.iter().collect()
    }

    #[test]
    fn test_term_and_terms() {
        let schema = schema();
        let snapshot = snapshot(&schema, &[(1, "red car", ""), (2, "blue bike", ""), (3, "red bike", "")]);
        let evaluator = QueryEvaluator::new(&snapshot, &schema);

        assert_eq!(rows(evaluator.evaluate(&Query::term("title", "red")).unwrap()), vec![1, 3]);
        assert_eq!(rows(evaluator.evaluate(&Query::terms("title", ["car", "blue"])).unwrap()), vec![1, 2]);
        assert!(evaluator.evaluate(&Query::term("title", "green")).unwrap().is_empty());
    }

    #[test]
    fn test_sentence_requires_adjacency() {
        let schema = schema();
        let snapshot = snapshot(&schema, &[
            (1, "", "the quick brown fox"),
            (2, "", "brown quick fox"),
            (3, "", "quick and brown"),
        ]);
        let evaluator = QueryEvaluator::new(&snapshot, &schema);

        assert_eq!(rows(evaluator.evaluate(&Query::sentence("body", "Quick Brown")).unwrap()), vec![1]);
        assert!(evaluator.evaluate(&Query::sentence("body", "  ")).unwrap().is_empty());
    }

    #[test]
    fn test_regex_is_anchored() {
        let schema = schema();
        let snapshot = snapshot(&schema, &[(1, "car", ""), (2, "cart", ""), (3, "scar", "")]);
        let evaluator = QueryEvaluator::new(&snapshot, &schema);

        assert_eq!(rows(evaluator.evaluate(&Query::regex("title", "car")).unwrap()), vec![1]);
        assert_eq!(rows(evaluator.evaluate(&Query::regex("title", "ca.*")).unwrap()), vec![1, 2]);
        let err = evaluator.evaluate(&Query::regex("title", "(")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_tombstones_and_unknown_columns() {
        let schema = schema();
        let mut snapshot = snapshot(&schema, &[(1, "red", ""), (2, "red", "")]);
        let mut deleted = RoaringTreemap::new();
        deleted.insert(1);
        snapshot.deleted_rows = Arc::new(deleted);
        let evaluator = QueryEvaluator::new(&snapshot, &schema);

        assert_eq!(rows(evaluator.evaluate(&Query::term("title", "red")).unwrap()), vec![2]);
        let err = evaluator.evaluate(&Query::term("summary", "red")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Schema);
    }
}
