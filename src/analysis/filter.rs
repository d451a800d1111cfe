use std::collections::HashSet;
use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::tokenizer::Token;

/// One stage of an analyzer after tokenization. Filters may drop tokens or
/// rewrite their text but never renumber positions.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;
}

pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for",
    "if", "in", "into", "is", "it", "no", "not", "of", "on", "or",
    "such", "that", "the", "their", "then", "there", "these", "they",
    "this", "to", "was", "will", "with",
];

/// Case folding for case-insensitive columns
pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            if token.text.chars().any(char::is_uppercase) {
                token.text = token.text.to_lowercase();
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

/// Drops tokens longer than `max_length` bytes
pub struct LengthFilter {
    pub max_length: usize,
}

impl LengthFilter {
    pub fn new(max_length: usize) -> Self {
        LengthFilter { max_length }
    }
}

impl TokenFilter for LengthFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        tokens.retain(|token| token.length <= self.max_length);
        tokens
    }

    fn name(&self) -> &str {
        "length_limit"
    }
}

pub struct StopWordFilter {
    stop_words: HashSet<String>,
}

impl StopWordFilter {
    pub fn new(stop_words: Vec<String>) -> Self {
        StopWordFilter {
            stop_words: stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn english() -> Self {
        StopWordFilter::new(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect())
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }
}

impl TokenFilter for StopWordFilter {
    // Remaining tokens keep their positions, so phrase matching still sees
    // the gap a removed stop word leaves behind.
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        tokens.retain(|token| !self.is_stop_word(&token.text));
        tokens
    }

    fn name(&self) -> &str {
        "stop_words"
    }
}

/// Snowball stemming; with several languages each stemmer runs in turn
pub struct StemmerFilter {
    stemmers: Vec<Stemmer>,
}

impl StemmerFilter {
    pub fn new(algorithms: &[Algorithm]) -> Self {
        StemmerFilter {
            stemmers: algorithms.iter().map(|a| Stemmer::create(*a)).collect(),
        }
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        for token in &mut tokens {
            for stemmer in &self.stemmers {
                let stemmed = stemmer.stem(&token.text).into_owned();
                token.text = stemmed;
            }
        }
        tokens
    }

    fn name(&self) -> &str {
        "stemmer"
    }
}

/// Character n-grams of every token; all grams share the token's position
pub struct NGramFilter {
    pub min_gram: usize,
    pub max_gram: usize,
    pub prefix_only: bool,
}

impl NGramFilter {
    pub fn new(min_gram: usize, max_gram: usize, prefix_only: bool) -> Self {
        NGramFilter { min_gram, max_gram, prefix_only }
    }
}

impl TokenFilter for NGramFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut result = Vec::new();

        for token in tokens {
            // (byte offset, char) pairs so grams slice on char boundaries
            let chars: Vec<(usize, char)> = token.text.char_indices().collect();
            let starts = if self.prefix_only { 1 } else { chars.len() };

            for start in 0..starts.min(chars.len()) {
                for n in self.min_gram..=self.max_gram {
                    let end = start + n;
                    if end > chars.len() {
                        break;
                    }
                    let from = chars[start].0;
                    let to = chars.get(end).map(|(i, _)| *i).unwrap_or(token.text.len());

                    result.push(Token {
                        text: token.text[from..to].to_string(),
                        position: token.position,
                        offset: token.offset + from,
                        length: to - from,
                    });
                }
            }
        }

        result
    }

    fn name(&self) -> &str {
        "ngram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<Token> {
        let mut offset = 0;
        words.iter()
            .enumerate()
            .map(|(i, w)| {
                let token = Token::new(w.to_string(), i as u32, offset);
                offset += w.len() + 1;
                token
            })
            .collect()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_stop_words_keep_positions() {
        let filtered = StopWordFilter::english().filter(tokens(&["The", "red", "and", "blue"]));
        assert_eq!(texts(&filtered), vec!["red", "blue"]);
        assert_eq!(filtered[1].position, 3);
    }

    #[test]
    fn test_length_limit_counts_bytes() {
        let filtered = LengthFilter::new(4).filter(tokens(&["tiny", "large", "ünï"]));
        assert_eq!(texts(&filtered), vec!["tiny"]);
    }

    #[test]
    fn test_stemmers_chain() {
        let filter = StemmerFilter::new(&[Algorithm::English]);
        assert_eq!(texts(&filter.filter(tokens(&["running", "cars"]))), vec!["run", "car"]);
        assert!(StemmerFilter::new(&[]).filter(tokens(&["running"]))[0].text == "running");
    }

    #[test]
    fn test_all_grams() {
        let grams = NGramFilter::new(2, 3, false).filter(vec![Token::new("rust".into(), 0, 0)]);
        assert_eq!(texts(&grams), vec!["ru", "rus", "us", "ust", "st"]);
    }

    #[test]
    fn test_prefix_grams_multibyte() {
        let grams = NGramFilter::new(1, 2, true).filter(vec![Token::new("héllo".into(), 3, 10)]);
        assert_eq!(texts(&grams), vec!["h", "hé"]);
        assert!(grams.iter().all(|t| t.position == 3));
        assert_eq!(grams[1].length, 3);
    }
}
