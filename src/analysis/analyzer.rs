use rust_stemmers::Algorithm;
use crate::analysis::filter::{
    LengthFilter, LowercaseFilter, NGramFilter, StemmerFilter, StopWordFilter, TokenFilter, ENGLISH_STOP_WORDS,
};
use crate::analysis::tokenizer::{RawTokenizer, SimpleTokenizer, StandardTokenizer, Token, Tokenizer, WhitespaceTokenizer};
use crate::core::config::TokenizerParameter;
use crate::core::error::{Error, Result};

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Build the analyzer a column was configured with
    pub fn from_parameter(parameter: &TokenizerParameter) -> Result<Self> {
        let analyzer = match parameter {
            TokenizerParameter::Default { case_sensitive, length_limit, .. } => {
                Analyzer::new("default".to_string(), Box::new(StandardTokenizer))
                    .with_case(*case_sensitive)
                    .add_filter(Box::new(LengthFilter::new(*length_limit)))
            }
            TokenizerParameter::Raw { case_sensitive } => {
                Analyzer::new("raw".to_string(), Box::new(RawTokenizer))
                    .with_case(*case_sensitive)
            }
            TokenizerParameter::Simple { case_sensitive, length_limit, .. } => {
                Analyzer::new("simple".to_string(), Box::new(SimpleTokenizer))
                    .with_case(*case_sensitive)
                    .add_filter(Box::new(LengthFilter::new(*length_limit)))
            }
            TokenizerParameter::Whitespace { case_sensitive, length_limit, .. } => {
                Analyzer::new("whitespace".to_string(), Box::new(WhitespaceTokenizer))
                    .with_case(*case_sensitive)
                    .add_filter(Box::new(LengthFilter::new(*length_limit)))
            }
            TokenizerParameter::Stem { stem_languages, case_sensitive, length_limit, .. } => {
                let mut algorithms = stem_languages.iter()
                    .map(|language| stem_algorithm(language))
                    .collect::<Result<Vec<_>>>()?;
                if algorithms.is_empty() {
                    algorithms.push(Algorithm::English);
                }
                Analyzer::new("stem".to_string(), Box::new(StandardTokenizer))
                    .with_case(*case_sensitive)
                    .add_filter(Box::new(LengthFilter::new(*length_limit)))
                    .add_filter(Box::new(StemmerFilter::new(&algorithms)))
            }
            TokenizerParameter::Ngram { min_gram, max_gram, prefix_only, case_sensitive, .. } => {
                Analyzer::new("ngram".to_string(), Box::new(StandardTokenizer))
                    .with_case(*case_sensitive)
                    .add_filter(Box::new(NGramFilter::new(*min_gram, *max_gram, *prefix_only)))
            }
        };

        // Stop words are removed before stemming and n-gram expansion
        let mut analyzer = analyzer;
        for name in parameter.stop_word_filters() {
            let filter = Box::new(StopWordFilter::new(stop_word_list(name)?));
            let at = analyzer.filters.iter()
                .position(|f| f.name() == "stemmer" || f.name() == "ngram")
                .unwrap_or(analyzer.filters.len());
            analyzer.filters.insert(at, filter);
        }

        Ok(analyzer)
    }

    fn with_case(self, case_sensitive: bool) -> Self {
        if case_sensitive {
            self
        } else {
            self.add_filter(Box::new(LowercaseFilter))
        }
    }
}

pub fn stem_algorithm(language: &str) -> Result<Algorithm> {
    let algorithm = match language.to_lowercase().as_str() {
        "arabic" => Algorithm::Arabic,
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "english" => Algorithm::English,
        "finnish" => Algorithm::Finnish,
        "french" => Algorithm::French,
        "german" => Algorithm::German,
        "greek" => Algorithm::Greek,
        "hungarian" => Algorithm::Hungarian,
        "italian" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" => Algorithm::Russian,
        "spanish" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "tamil" => Algorithm::Tamil,
        "turkish" => Algorithm::Turkish,
        other => {
            return Err(Error::invalid_argument(format!("unsupported stem language '{}'", other)));
        }
    };
    Ok(algorithm)
}

pub fn stop_word_list(name: &str) -> Result<Vec<String>> {
    match name.to_lowercase().as_str() {
        "english" => Ok(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect()),
        other => Err(Error::invalid_argument(format!("unsupported stop word filter '{}'", other))),
    }
}
