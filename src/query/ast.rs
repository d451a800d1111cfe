use serde::{Serialize, Deserialize};

/// Row-set queries against one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Term(TermQuery),         // Exact token
    Terms(TermsQuery),       // Any of several tokens
    Sentence(SentenceQuery), // Contiguous token sequence
    Regex(RegexQuery),       // Full-term pattern over the dictionary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub column: String,
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsQuery {
    pub column: String,
    pub terms: Vec<String>,
}

/// Text is run through the column's analyzer before matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceQuery {
    pub column: String,
    pub sentence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexQuery {
    pub column: String,
    pub pattern: String,
}

impl Query {
    pub fn term(column: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Term(TermQuery { column: column.into(), term: term.into() })
    }

    pub fn terms<I, S>(column: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Terms(TermsQuery {
            column: column.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        })
    }

    pub fn sentence(column: impl Into<String>, sentence: impl Into<String>) -> Self {
        Query::Sentence(SentenceQuery { column: column.into(), sentence: sentence.into() })
    }

    pub fn regex(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Query::Regex(RegexQuery { column: column.into(), pattern: pattern.into() })
    }

    pub fn column(&self) -> &str {
        match self {
            Query::Term(q) => &q.column,
            Query::Terms(q) => &q.column,
            Query::Sentence(q) => &q.column,
            Query::Regex(q) => &q.column,
        }
    }
}
