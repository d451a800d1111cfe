mod common;

use common::{create, doc};
use rowsearch::search::bitmap;
use rowsearch::{AliveFilter, Bm25Request, IndexHandle, RowIdWithScore, Statistics};
use roaring::RoaringTreemap;

fn loaded(dir: &std::path::Path, docs: &[(u64, &str, &str)]) -> IndexHandle {
    let index = create(dir, &["title", "body"]);
    for (row, title, body) in docs {
        index.add_document(doc(*row, &[("title", *title), ("body", *body)])).unwrap();
    }
    index.commit().unwrap();
    index.load_reader().unwrap();
    index
}

fn score_of(hits: &[RowIdWithScore], row_id: u64) -> f32 {
    hits.iter().find(|h| h.row_id == row_id).map(|h| h.score).unwrap()
}

#[test]
fn test_higher_term_frequency_scores_higher() {
    let dir = tempfile::tempdir().unwrap();
    let index = loaded(dir.path(), &[
        (1, "", "apple banana cherry"),
        (2, "", "apple apple cherry"),
        (3, "", "banana cherry date"),
    ]);
    let hits = index.reader().unwrap().bm25_search(&Bm25Request::new("apple", 10)).unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].row_id, 2);
    assert!(score_of(&hits, 2) > score_of(&hits, 1));
}

#[test]
fn test_ties_break_on_row_id_and_top_k_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let index = loaded(dir.path(), &[
        (7, "same words", ""),
        (3, "same words", ""),
        (5, "same words", ""),
        (9, "other", ""),
    ]);
    let hits = index.reader().unwrap().bm25_search(&Bm25Request::new("same", 2)).unwrap();
    let ids: Vec<u64> = hits.iter().map(|h| h.row_id).collect();
    assert_eq!(ids, vec![3, 5]);
}

#[test]
fn test_column_restriction_and_operator() {
    let dir = tempfile::tempdir().unwrap();
    let index = loaded(dir.path(), &[
        (1, "red car", "nothing here"),
        (2, "car", "red paint"),
        (3, "blue car", "blue paint"),
    ]);
    let reader = index.reader().unwrap();

    let body_only = reader
        .bm25_search(&Bm25Request::new("red", 10).with_columns(vec!["body".to_string()]))
        .unwrap();
    assert_eq!(body_only.iter().map(|h| h.row_id).collect::<Vec<_>>(), vec![2]);

    // AND is satisfied by terms spread over different columns
    let both = reader
        .bm25_search(&Bm25Request::new("red car", 10).with_operator_or(false))
        .unwrap();
    let mut ids: Vec<u64> = both.iter().map(|h| h.row_id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let any = reader.bm25_search(&Bm25Request::new("red car", 10)).unwrap();
    assert_eq!(any.len(), 3);

    let err = reader
        .bm25_search(&Bm25Request::new("red", 10).with_columns(vec!["summary".to_string()]))
        .unwrap_err();
    assert_eq!(err.kind, rowsearch::ErrorKind::Schema);
}

#[test]
fn test_alive_filter_restricts_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let index = loaded(dir.path(), &[
        (1, "car", ""),
        (2, "car", ""),
        (12, "car", ""),
    ]);
    let reader = index.reader().unwrap();

    let mut alive = RoaringTreemap::new();
    alive.insert(2);
    alive.insert(12);
    let bytes = bitmap::encode(&alive, 16).unwrap();
    let filter = AliveFilter::from_bitmap(&bytes, true).unwrap();
    let hits = reader.bm25_search(&Bm25Request::new("car", 10).with_alive_filter(filter)).unwrap();
    assert_eq!(hits.iter().map(|h| h.row_id).collect::<Vec<_>>(), vec![2, 12]);

    // Rows past the end of a short bitmap are not alive
    let short = bitmap::encode(&alive, 8).err();
    assert!(short.is_some());
    let filter = AliveFilter::from_bitmap(&[0b0000_0110], true).unwrap();
    let hits = reader.bm25_search(&Bm25Request::new("car", 10).with_alive_filter(filter)).unwrap();
    assert_eq!(hits.iter().map(|h| h.row_id).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_merged_statistics_match_a_single_index() {
    let part_a = [
        (1, "rust compiler", "borrow checker rules"),
        (2, "rust book", "ownership and borrowing"),
    ];
    let part_b = [
        (3, "go compiler", "garbage collector"),
        (4, "c compiler", "manual memory and pointers"),
        (5, "rust async", "futures and executors"),
    ];
    let query = "rust compiler";

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let dir_all = tempfile::tempdir().unwrap();
    let a = loaded(dir_a.path(), &part_a);
    let b = loaded(dir_b.path(), &part_b);
    let all: Vec<_> = part_a.iter().chain(part_b.iter()).cloned().collect();
    let whole = loaded(dir_all.path(), &all);

    let (reader_a, reader_b) = (a.reader().unwrap(), b.reader().unwrap());
    let merged = Statistics::merge([&reader_a.statistics(query), &reader_b.statistics(query)]);
    assert_eq!(merged.total_num_docs, 5);

    let expected = whole.reader().unwrap().bm25_search(&Bm25Request::new(query, 10)).unwrap();
    let hits_a = reader_a.bm25_search(&Bm25Request::new(query, 10).with_statistics(merged.clone())).unwrap();
    let hits_b = reader_b.bm25_search(&Bm25Request::new(query, 10).with_statistics(merged)).unwrap();

    for hit in hits_a.iter().chain(hits_b.iter()) {
        let reference = score_of(&expected, hit.row_id);
        assert!((hit.score - reference).abs() < 1e-5, "row {}: {} vs {}", hit.row_id, hit.score, reference);
    }
    assert_eq!(hits_a.len() + hits_b.len(), expected.len());

    // Local statistics give part A a different idf for "compiler"
    let local = reader_a.bm25_search(&Bm25Request::new(query, 10)).unwrap();
    assert!((score_of(&local, 1) - score_of(&expected, 1)).abs() > 1e-5);
}

#[test]
fn test_need_doc_lists_matched_terms() {
    let dir = tempfile::tempdir().unwrap();
    let index = loaded(dir.path(), &[(1, "red car", "red")]);
    let hits = index.reader().unwrap()
        .bm25_search(&Bm25Request::new("red car bike", 10).with_need_doc(true))
        .unwrap();
    let mut terms = hits[0].docs.clone();
    terms.sort();
    assert_eq!(terms, vec!["car".to_string(), "red".to_string()]);
}
