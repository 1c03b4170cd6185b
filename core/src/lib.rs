//! Core of the MapIndex pipeline: tokenization with context windows, the
//! per-(document, word) aggregation, the inverted index and TF-IDF ranking.

pub mod aggregate;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod lengths;
pub mod persist;
pub mod search;
pub mod stopwords;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};
pub use index::{build_index, IndexBuilder, InvertedIndex};
pub use lengths::DocumentLengths;
pub use search::{search, QuerySession, ScoredPosting, SearchOutcome};
pub use stopwords::{StopWords, StopwordFilter};

/// One document of the combined corpus stream, already cleaned upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub document_id: String,
    pub title: String,
    pub content: String,
}

/// Aggregated statistics for one `(document_id, title, word)` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordDocStat {
    pub document_id: String,
    pub title: String,
    pub word: String,
    /// Number of occurrences. Not reduced by context truncation.
    pub frequency: u32,
    /// Context windows in first-seen order.
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub document_id: String,
    pub title: String,
    pub frequency: u32,
    pub contexts: Vec<String>,
}

impl From<WordDocStat> for Posting {
    fn from(stat: WordDocStat) -> Self {
        Posting {
            document_id: stat.document_id,
            title: stat.title,
            frequency: stat.frequency,
            contexts: stat.contexts,
        }
    }
}
