use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::analysis::analyzer::Analyzer;
use crate::analysis::tokenizer::Token;
use crate::core::config::{ColumnParameter, IndexParameter};
use crate::core::error::{Error, Result};
use crate::core::types::{Document, FieldId};
use crate::storage::layout::StorageLayout;

/// Column definition with its indexing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub field_id: FieldId,
    pub parameter: ColumnParameter,
}

/// Column set chosen at index creation; immutable afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub columns: Vec<ColumnDefinition>,
}

impl IndexSchema {
    pub fn new(column_names: &[String], parameter: &IndexParameter) -> Result<Self> {
        if column_names.is_empty() {
            return Err(Error::schema("an index needs at least one column"));
        }

        let mut seen = HashSet::new();
        for name in column_names {
            if name.is_empty() {
                return Err(Error::schema("column names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::schema(format!("column '{}' declared twice", name)));
            }
        }
        parameter.check_columns(column_names)?;

        let columns = column_names.iter()
            .enumerate()
            .map(|(i, name)| {
                let column = parameter.column(name);
                column.validate()?;
                Ok(ColumnDefinition {
                    name: name.clone(),
                    field_id: FieldId(i as u32),
                    parameter: column,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(IndexSchema { columns })
    }

    pub fn field_id(&self, column_name: &str) -> Result<FieldId> {
        self.columns.iter()
            .find(|c| c.name == column_name)
            .map(|c| c.field_id)
            .ok_or_else(|| Error::schema(format!("column '{}' is not declared in this index", column_name)))
    }

    pub fn column(&self, field_id: FieldId) -> Option<&ColumnDefinition> {
        self.columns.get(field_id.as_usize())
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Reject documents that name undeclared columns
    pub fn validate_document(&self, doc: &Document) -> Result<()> {
        for name in doc.columns.keys() {
            self.field_id(name)?;
        }
        Ok(())
    }

    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.meta_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(path)?;
        let meta: IndexMeta = serde_json::from_slice(&data)?;
        if meta.version != IndexMeta::VERSION {
            return Err(Error::corrupted(format!(
                "unsupported index meta version {}",
                meta.version
            )));
        }
        Ok(Some(meta.schema))
    }

    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let meta = IndexMeta {
            version: IndexMeta::VERSION,
            created_at: Utc::now(),
            schema: self.clone(),
        };
        let data = serde_json::to_vec_pretty(&meta)?;
        storage.write_atomic(&storage.meta_path(), &data)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexMeta {
    version: u32,
    created_at: DateTime<Utc>,
    schema: IndexSchema,
}

impl IndexMeta {
    const VERSION: u32 = 1;
}

/// Schema plus the analyzer built for every column
pub struct SchemaWithAnalyzer {
    pub schema: IndexSchema,
    pub analyzers: Vec<Arc<Analyzer>>,
}

impl SchemaWithAnalyzer {
    pub fn new(schema: IndexSchema) -> Result<Self> {
        let analyzers = schema.columns.iter()
            .map(|c| Analyzer::from_parameter(&c.parameter.tokenizer).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(SchemaWithAnalyzer { schema, analyzers })
    }

    pub fn analyze(&self, field_id: FieldId, text: &str) -> Vec<Token> {
        match self.analyzers.get(field_id.as_usize()) {
            Some(analyzer) => analyzer.analyze(text),
            None => Vec::new(),
        }
    }

    /// Resolve column names to field ids; an empty list means every column
    pub fn resolve_columns(&self, column_names: &[String]) -> Result<Vec<FieldId>> {
        if column_names.is_empty() {
            return Ok(self.schema.columns.iter().map(|c| c.field_id).collect());
        }
        let mut field_ids = Vec::with_capacity(column_names.len());
        for name in column_names {
            let field_id = self.schema.field_id(name)?;
            if !field_ids.contains(&field_id) {
                field_ids.push(field_id);
            }
        }
        Ok(field_ids)
    }
}
