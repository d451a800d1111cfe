//! Fail-soft boundary over [`IndexHandle`].
//!
//! Every function returns an [`ApiResult`] instead of a `Result`, and panics
//! raised underneath are caught and reported as `ErrorKind::Internal`. The
//! caller is expected to check `is_error()` on every result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::error;
use crate::core::config::{Config, IndexParameter};
use crate::core::error::{ErrorKind, Result};
use crate::core::index::IndexHandle;
use crate::core::stats::{DocWithFreq, FieldTokenNums, Statistics};
use crate::search::bitmap::AliveFilter;
use crate::search::executor::Bm25Request;
use crate::search::results::RowIdWithScore;

/// Value or error descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Ok(T),
    Err { kind: ErrorKind, message: String },
}

impl<T> ApiResult<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, ApiResult::Err { .. })
    }

    /// Error message, empty on success
    pub fn message(&self) -> &str {
        match self {
            ApiResult::Ok(_) => "",
            ApiResult::Err { message, .. } => message,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiResult::Ok(_) => None,
            ApiResult::Err { kind, .. } => Some(*kind),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ApiResult::Ok(value) => Some(value),
            ApiResult::Err { .. } => None,
        }
    }
}

fn guard<T>(operation: &str, f: impl FnOnce() -> Result<T>) -> ApiResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => ApiResult::Ok(value),
        Ok(Err(e)) => {
            error!(operation, error = %e, "operation failed");
            ApiResult::Err { kind: e.kind, message: e.to_string() }
        }
        Err(payload) => {
            let message = format!("Internal: panic in {}: {}", operation, panic_message(payload.as_ref()));
            error!(operation, %message, "operation panicked");
            ApiResult::Err { kind: ErrorKind::Internal, message }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn verify_index_parameter(parameter_json: &str) -> ApiResult<bool> {
    guard("verify_index_parameter", || {
        IndexParameter::parse(parameter_json)?;
        Ok(true)
    })
}

pub fn create_index(index_path: impl AsRef<Path>, column_names: &[String]) -> ApiResult<IndexHandle> {
    create_index_with_parameter(index_path, column_names, "")
}

pub fn create_index_with_parameter(
    index_path: impl AsRef<Path>,
    column_names: &[String],
    parameter_json: &str,
) -> ApiResult<IndexHandle> {
    guard("create_index", || {
        IndexHandle::create(index_path, column_names, parameter_json, Config::default())
    })
}

/// Open an existing index with neither writer nor reader loaded
pub fn open_index(index_path: impl AsRef<Path>) -> ApiResult<IndexHandle> {
    guard("open_index", || IndexHandle::open(index_path, Config::default()))
}

pub fn index_multi_column_docs(
    index: &IndexHandle,
    row_id: u64,
    column_names: &[String],
    column_docs: &[String],
) -> ApiResult<bool> {
    guard("index_multi_column_docs", || {
        index.index_multi_column_docs(row_id, column_names, column_docs)?;
        Ok(true)
    })
}

pub fn delete_row_ids(index: &IndexHandle, row_ids: &[u64]) -> ApiResult<bool> {
    guard("delete_row_ids", || {
        index.delete_rows(row_ids)?;
        Ok(true)
    })
}

pub fn index_writer_commit(index: &IndexHandle) -> ApiResult<bool> {
    guard("index_writer_commit", || {
        index.commit()?;
        Ok(true)
    })
}

pub fn load_index_writer(index: &IndexHandle) -> ApiResult<bool> {
    guard("load_index_writer", || {
        index.load_writer()?;
        Ok(true)
    })
}

pub fn free_index_writer(index: &IndexHandle) -> ApiResult<bool> {
    guard("free_index_writer", || {
        index.free_writer()?;
        Ok(true)
    })
}

pub fn load_index_reader(index: &IndexHandle) -> ApiResult<bool> {
    guard("load_index_reader", || {
        index.load_reader()?;
        Ok(true)
    })
}

pub fn free_index_reader(index: &IndexHandle) -> ApiResult<bool> {
    guard("free_index_reader", || {
        index.free_reader()?;
        Ok(true)
    })
}

pub fn get_indexed_doc_counts(index: &IndexHandle) -> ApiResult<u64> {
    guard("get_indexed_doc_counts", || Ok(index.reader()?.indexed_doc_counts()))
}

pub fn query_term_bitmap(index: &IndexHandle, column_name: &str, term: &str) -> ApiResult<Vec<u8>> {
    guard("query_term_bitmap", || index.reader()?.query_term_bitmap(column_name, term))
}

pub fn query_terms_bitmap(index: &IndexHandle, column_name: &str, terms: &[String]) -> ApiResult<Vec<u8>> {
    guard("query_terms_bitmap", || index.reader()?.query_terms_bitmap(column_name, terms))
}

pub fn query_sentence_bitmap(index: &IndexHandle, column_name: &str, sentence: &str) -> ApiResult<Vec<u8>> {
    guard("query_sentence_bitmap", || index.reader()?.query_sentence_bitmap(column_name, sentence))
}

pub fn regex_term_bitmap(index: &IndexHandle, column_name: &str, pattern: &str) -> ApiResult<Vec<u8>> {
    guard("regex_term_bitmap", || index.reader()?.regex_term_bitmap(column_name, pattern))
}

#[allow(clippy::too_many_arguments)]
pub fn bm25_search(
    index: &IndexHandle,
    sentence: &str,
    column_names: &[String],
    top_k: u32,
    alive_bitmap: &[u8],
    query_with_filter: bool,
    enable_nlq: bool,
    operator_or: bool,
    statistics: &Statistics,
    need_doc: bool,
) -> ApiResult<Vec<RowIdWithScore>> {
    guard("bm25_search", || {
        let reader = index.reader()?;
        let request = Bm25Request::new(sentence, top_k as usize)
            .with_columns(column_names.to_vec())
            .with_alive_filter(AliveFilter::from_bitmap(alive_bitmap, query_with_filter)?)
            .with_natural_language(enable_nlq)
            .with_operator_or(operator_or)
            .with_statistics(statistics.clone())
            .with_need_doc(need_doc);
        reader.bm25_search(&request)
    })
}

pub fn get_doc_freq(index: &IndexHandle, sentence: &str) -> ApiResult<Vec<DocWithFreq>> {
    guard("get_doc_freq", || Ok(index.reader()?.doc_freq(sentence)))
}

pub fn get_total_num_docs(index: &IndexHandle) -> ApiResult<u64> {
    guard("get_total_num_docs", || Ok(index.reader()?.total_num_docs()))
}

pub fn get_total_num_tokens(index: &IndexHandle) -> ApiResult<Vec<FieldTokenNums>> {
    guard("get_total_num_tokens", || Ok(index.reader()?.total_num_tokens()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_reported_not_raised() {
        let result = verify_index_parameter("{not json");
        assert!(result.is_error());
        assert_eq!(result.kind(), Some(ErrorKind::InvalidArgument));
        assert!(!result.message().is_empty());

        assert!(!verify_index_parameter("").is_error());
    }

    #[test]
    fn test_panics_become_internal_errors() {
        let result: ApiResult<()> = guard("test", || panic!("boom"));
        assert_eq!(result.kind(), Some(ErrorKind::Internal));
        assert!(result.message().contains("boom"));
    }
}
