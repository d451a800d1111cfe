#![allow(dead_code)]

use std::path::Path;
use rowsearch::search::bitmap;
use rowsearch::{Config, Document, IndexHandle, RowId};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn doc(row_id: u64, fields: &[(&str, &str)]) -> Document {
    let mut doc = Document::new(RowId(row_id));
    for (name, text) in fields {
        doc.add_column(*name, *text);
    }
    doc
}

pub fn create(path: &Path, names: &[&str]) -> IndexHandle {
    init_tracing();
    IndexHandle::create(path, &columns(names), "", Config::default()).unwrap()
}

/// Row ids set in an encoded result bitmap
pub fn rows(bytes: &[u8]) -> Vec<u64> {
    bitmap::decode(bytes, bytes.len() as u64 * 8)
        .unwrap()
        .iter()
        .collect()
}
