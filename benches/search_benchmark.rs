use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use rowsearch::{Bm25Request, Config, Document, IndexHandle, RowId};
use tempfile::TempDir;

const WORDS: [&str; 12] = [
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "red", "car", "fast", "slow",
];

/// Helper to create test documents
fn create_test_document(id: u64, content_size: usize) -> Document {
    let mut rng = rand::thread_rng();
    let content: String = (0..content_size)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ");

    Document::new(RowId(id))
        .with_column("title", format!("Document {}", id))
        .with_column("body", content)
}

fn create_index(dir: &TempDir) -> IndexHandle {
    let columns = vec!["title".to_string(), "body".to_string()];
    let config = Config { sync_on_commit: false, ..Config::default() };
    IndexHandle::create(dir.path(), &columns, "", config).unwrap()
}

/// Benchmark buffering plus commit of one batch
fn bench_add_and_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_and_commit");

    for batch_size in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let dir = tempfile::tempdir().unwrap();
                let index = create_index(&dir);
                let mut next_id = 0u64;
                b.iter(|| {
                    let docs: Vec<Document> = (next_id..next_id + batch_size)
                        .map(|id| create_test_document(id, 50))
                        .collect();
                    next_id += batch_size;
                    index.add_documents(docs).unwrap();
                    black_box(index.commit().unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark ranked search over a committed index
fn bench_bm25_search(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let index = create_index(&dir);
    for chunk in 0..10u64 {
        let docs: Vec<Document> = (chunk * 1000..(chunk + 1) * 1000)
            .map(|id| create_test_document(id, 50))
            .collect();
        index.add_documents(docs).unwrap();
        index.commit().unwrap();
    }
    index.load_reader().unwrap();
    let reader = index.reader().unwrap();

    let mut group = c.benchmark_group("bm25_search");
    for (name, request) in [
        ("single_term", Bm25Request::new("fox", 10)),
        ("or_query", Bm25Request::new("quick red car", 10)),
        ("and_query", Bm25Request::new("quick red car", 10).with_operator_or(false)),
        ("natural_language", Bm25Request::new("the lazy dog", 100).with_natural_language(true)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(reader.bm25_search(&request).unwrap()));
        });
    }
    group.finish();

    c.bench_function("term_bitmap", |b| {
        b.iter(|| black_box(reader.query_term_bitmap("body", "dog").unwrap()));
    });
}

criterion_group!(benches, bench_add_and_commit, bench_bm25_search);
criterion_main!(benches);
