use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::analysis::analyzer::{stem_algorithm, stop_word_list};
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub compression: CompressionType,
    pub sync_on_commit: bool,

    // Merge policy
    pub max_segments_per_tier: usize,
    pub min_segments_to_merge: usize,
    pub max_segments_to_merge: usize,
    pub max_merge_doc_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            compression: CompressionType::LZ4,
            sync_on_commit: true,
            max_segments_per_tier: 10,
            min_segments_to_merge: 2,
            max_segments_to_merge: 10,
            max_merge_doc_count: 1_000_000,
        }
    }
}

/// BM25 free parameters, fixed per column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32, // Term frequency saturation
    pub b: f32,  // Length normalization strength
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

fn default_length_limit() -> usize {
    40
}

fn default_true() -> bool {
    true
}

fn default_min_gram() -> usize {
    2
}

fn default_max_gram() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenizerParameter {
    Default {
        #[serde(default)]
        stop_word_filters: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default = "default_length_limit")]
        length_limit: usize,
    },
    Raw {
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    Simple {
        #[serde(default)]
        stop_word_filters: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default = "default_length_limit")]
        length_limit: usize,
    },
    Whitespace {
        #[serde(default)]
        stop_word_filters: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default = "default_length_limit")]
        length_limit: usize,
    },
    Stem {
        #[serde(default)]
        stop_word_filters: Vec<String>,
        #[serde(default)]
        stem_languages: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default = "default_length_limit")]
        length_limit: usize,
    },
    Ngram {
        #[serde(default = "default_min_gram")]
        min_gram: usize,
        #[serde(default = "default_max_gram")]
        max_gram: usize,
        #[serde(default)]
        prefix_only: bool,
        #[serde(default)]
        stop_word_filters: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
}

impl Default for TokenizerParameter {
    fn default() -> Self {
        TokenizerParameter::Default {
            stop_word_filters: Vec::new(),
            case_sensitive: false,
            length_limit: default_length_limit(),
        }
    }
}

impl TokenizerParameter {
    pub fn stop_word_filters(&self) -> &[String] {
        match self {
            TokenizerParameter::Default { stop_word_filters, .. }
            | TokenizerParameter::Simple { stop_word_filters, .. }
            | TokenizerParameter::Whitespace { stop_word_filters, .. }
            | TokenizerParameter::Stem { stop_word_filters, .. }
            | TokenizerParameter::Ngram { stop_word_filters, .. } => stop_word_filters,
            TokenizerParameter::Raw { .. } => &[],
        }
    }

    pub fn validate(&self) -> Result<()> {
        for name in self.stop_word_filters() {
            stop_word_list(name)?;
        }
        match self {
            TokenizerParameter::Stem { stem_languages, .. } => {
                for language in stem_languages {
                    stem_algorithm(language)?;
                }
            }
            TokenizerParameter::Ngram { min_gram, max_gram, .. } => {
                if *min_gram == 0 || min_gram > max_gram {
                    return Err(Error::invalid_argument(format!(
                        "ngram requires 0 < min_gram <= max_gram, got {}..{}",
                        min_gram, max_gram
                    )));
                }
            }
            TokenizerParameter::Default { length_limit, .. }
            | TokenizerParameter::Simple { length_limit, .. }
            | TokenizerParameter::Whitespace { length_limit, .. } => {
                if *length_limit == 0 {
                    return Err(Error::invalid_argument("length_limit must be positive"));
                }
            }
            TokenizerParameter::Raw { .. } => {}
        }
        Ok(())
    }
}

/// Indexing options of one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnParameter {
    #[serde(default)]
    pub tokenizer: TokenizerParameter,
    #[serde(default)]
    pub bm25: Option<Bm25Params>,
}

impl ColumnParameter {
    pub fn bm25(&self) -> Bm25Params {
        self.bm25.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        self.tokenizer.validate()?;
        if let Some(params) = &self.bm25 {
            if !(params.k1 >= 0.0) || !(0.0..=1.0).contains(&params.b) {
                return Err(Error::invalid_argument(format!(
                    "bm25 requires k1 >= 0 and 0 <= b <= 1, got k1={} b={}",
                    params.k1, params.b
                )));
            }
        }
        Ok(())
    }
}

/// Per-column parameters supplied as JSON at index creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexParameter {
    pub columns: BTreeMap<String, ColumnParameter>,
}

impl IndexParameter {
    /// Parse and validate. An empty string means "all columns use defaults".
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(IndexParameter::default());
        }
        let parameter: IndexParameter = serde_json::from_str(json)?;
        for column in parameter.columns.values() {
            column.validate()?;
        }
        Ok(parameter)
    }

    /// Check that every configured column is one of the declared columns.
    pub fn check_columns(&self, declared: &[String]) -> Result<()> {
        for name in self.columns.keys() {
            if !declared.iter().any(|c| c == name) {
                return Err(Error::schema(format!(
                    "index parameter names column '{}' which is not declared",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> ColumnParameter {
        self.columns.get(name).cloned().unwrap_or_default()
    }
}
