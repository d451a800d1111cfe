use serde::{Serialize, Deserialize};
use std::collections::HashMap;

/// Largest accepted row id. Result bitmaps hold one bit per row ordinal up
/// to the largest committed row, so this bounds them at 512 MiB.
pub const MAX_ROW_ID: u64 = u32::MAX as u64;

/// Caller-assigned row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        RowId(id)
    }
}

/// Ordinal of a column in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub u32);

impl FieldId {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Per-segment document ordinal
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub row_id: RowId,
    pub columns: HashMap<String, String>,
}

impl Document {
    pub fn new(row_id: RowId) -> Self {
        Document {
            row_id,
            columns: HashMap::new(),
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.columns.insert(name.into(), text.into());
    }

    pub fn with_column(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_column(name, text);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&str> {
        self.columns.get(name).map(|s| s.as_str())
    }
}
