use serde::{Serialize, Deserialize};
use unicode_segmentation::UnicodeSegmentation;

/// One analyzed term of a column text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,     // Word ordinal in the column text, drives phrase matching
    pub offset: usize,     // Byte offset in the original text
    pub length: usize,     // Byte length before any filter rewrote `text`
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        let length = text.len();
        Token { text, position, offset, length }
    }
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Standard Unicode tokenizer (UAX #29 word boundaries)
#[derive(Clone, Default)]
pub struct StandardTokenizer;

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.unicode_word_indices()
            .enumerate()
            .map(|(position, (offset, word))| Token::new(word.to_string(), position as u32, offset))
            .collect()
    }

    fn name(&self) -> &str {
        "default"
    }
}

/// Splits on every character that is not alphanumeric
#[derive(Clone, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        split_tokens(text, |c: char| !c.is_alphanumeric())
    }

    fn name(&self) -> &str {
        "simple"
    }
}

#[derive(Clone, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        split_tokens(text, char::is_whitespace)
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Emits the whole text as a single token
#[derive(Clone, Default)]
pub struct RawTokenizer;

impl Tokenizer for RawTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![Token::new(text.to_string(), 0, 0)]
    }

    fn name(&self) -> &str {
        "raw"
    }
}

fn split_tokens<P>(text: &str, is_separator: P) -> Vec<Token>
where
    P: Fn(char) -> bool,
{
    text.split(is_separator)
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(position, word)| {
            // `word` is a subslice of `text`
            let offset = word.as_ptr() as usize - text.as_ptr() as usize;
            Token::new(word.to_string(), position as u32, offset)
        })
        .collect()
}
