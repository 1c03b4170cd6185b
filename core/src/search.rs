//! TF-IDF ranking over a built [`InvertedIndex`].
//!
//! For a term with postings `P` over a corpus of `N` documents:
//! `idf = ln(N / |P|)` and, per posting, `tf = frequency / length(doc)` with
//! missing or zero lengths treated as 1. Results are ordered by `tf * idf`
//! descending with a stable sort, so equal scores keep posting order. A term
//! present in every document has `idf <= 0`; those scores are returned as is.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::persist::IndexSnapshot;
use crate::{DocumentLengths, InvertedIndex};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_DISPLAY_LEN: usize = 100;
pub const NO_CONTEXT: &str = "No context available.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPosting {
    pub document_id: String,
    pub title: String,
    pub frequency: u32,
    pub score: f64,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The term is indexed. `results` holds at most `top_k` postings.
    Found {
        document_frequency: usize,
        idf: f64,
        results: Vec<ScoredPosting>,
    },
    /// No document contains the term.
    NotFound,
}

impl SearchOutcome {
    pub fn results(&self) -> &[ScoredPosting] {
        match self {
            SearchOutcome::Found { results, .. } => results,
            SearchOutcome::NotFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }
}

pub fn idf(num_docs: usize, document_frequency: usize) -> f64 {
    (num_docs as f64 / document_frequency as f64).ln()
}

/// Rank the postings of `term` and return the best `top_k`.
pub fn search(
    index: &InvertedIndex,
    term: &str,
    num_docs: usize,
    lengths: &DocumentLengths,
    top_k: usize,
) -> SearchOutcome {
    let term = term.to_lowercase();
    let postings = match index.postings(&term) {
        Some(p) if !p.is_empty() => p,
        _ => return SearchOutcome::NotFound,
    };

    let df = postings.len();
    let idf = idf(num_docs, df);

    let mut scored: Vec<ScoredPosting> = postings
        .iter()
        .map(|p| {
            let tf = p.frequency as f64 / lengths.denominator(&p.document_id) as f64;
            ScoredPosting {
                document_id: p.document_id.clone(),
                title: p.title.clone(),
                frequency: p.frequency,
                score: tf * idf,
                contexts: p.contexts.clone(),
            }
        })
        .collect();

    // sort_by is stable: ties keep posting order
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k.min(df));

    SearchOutcome::Found { document_frequency: df, idf, results: scored }
}

/// A loaded snapshot with `N` fixed for the session. Cheap to share across
/// threads; every query reads the same immutable snapshot.
#[derive(Debug, Clone)]
pub struct QuerySession {
    snapshot: Arc<IndexSnapshot>,
    num_docs: usize,
}

impl QuerySession {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Result<Self> {
        let num_docs = snapshot.lengths.len();
        if num_docs == 0 {
            return Err(Error::EmptyCorpus);
        }
        Ok(Self { snapshot, num_docs })
    }

    pub fn search(&self, term: &str, top_k: usize) -> SearchOutcome {
        search(&self.snapshot.index, term, self.num_docs, &self.snapshot.lengths, top_k)
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn snapshot(&self) -> &IndexSnapshot {
        &self.snapshot
    }
}

/// First context of a posting, cut to `max_len` characters with `...` appended.
pub fn display_context(contexts: &[String], max_len: usize) -> String {
    let Some(first) = contexts.first() else {
        return NO_CONTEXT.to_string();
    };
    match first.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &first[..cut]),
        None => first.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_index, StopWords, WordDocStat};

    fn stat(doc: &str, word: &str, frequency: u32) -> WordDocStat {
        WordDocStat {
            document_id: doc.into(),
            title: doc.to_uppercase(),
            word: word.into(),
            frequency,
            contexts: vec![format!("ctx {doc}")],
        }
    }

    fn lengths(pairs: &[(&str, i64)]) -> DocumentLengths {
        let mut l = DocumentLengths::new();
        for (id, n) in pairs {
            l.insert(id.to_string(), *n);
        }
        l
    }

    #[test]
    fn ranks_by_tf_idf() {
        let idx = build_index(
            vec![stat("a", "rust", 1), stat("b", "rust", 5), stat("c", "go", 1)],
            &StopWords::none(),
        )
        .unwrap();
        let l = lengths(&[("a", 10), ("b", 10), ("c", 10)]);
        let out = search(&idx, "RUST", 3, &l, 10);
        let results = out.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, "b");
        let expected = 0.5 * (3.0f64 / 2.0).ln();
        assert!((results[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn equal_scores_keep_posting_order() {
        let idx = build_index(
            vec![stat("z", "cat", 1), stat("y", "cat", 1), stat("x", "cat", 1), stat("w", "dog", 1)],
            &StopWords::none(),
        )
        .unwrap();
        let l = lengths(&[("z", 4), ("y", 4), ("x", 4), ("w", 4)]);
        let ids: Vec<_> = search(&idx, "cat", 4, &l, 10).results().iter().map(|r| r.document_id.clone()).collect();
        assert_eq!(ids, vec!["z", "y", "x"]);
    }

    #[test]
    fn term_in_every_document_scores_non_positive() {
        let idx = build_index(vec![stat("a", "cat", 2), stat("b", "cat", 1)], &StopWords::none()).unwrap();
        let l = lengths(&[("a", 5), ("b", 1)]);
        match search(&idx, "cat", 1, &l, 10) {
            SearchOutcome::Found { idf, results, .. } => {
                assert!(idf < 0.0);
                assert!(results.iter().all(|r| r.score <= 0.0));
                // smaller tf is the least negative
                assert_eq!(results[0].document_id, "a");
            }
            SearchOutcome::NotFound => panic!("expected results"),
        }
    }

    #[test]
    fn top_k_limits_results() {
        let idx = build_index(vec![stat("a", "cat", 1), stat("b", "cat", 2)], &StopWords::none()).unwrap();
        let out = search(&idx, "cat", 5, &DocumentLengths::new(), 1);
        assert_eq!(out.results().len(), 1);
        assert_eq!(out.results()[0].document_id, "b");
    }

    #[test]
    fn idf_decreases_with_document_frequency() {
        assert!(idf(10, 1) > idf(10, 2));
        assert_eq!(idf(2, 2), 0.0);
    }

    #[test]
    fn session_requires_documents() {
        let snapshot = Arc::new(IndexSnapshot::default());
        assert!(matches!(QuerySession::new(snapshot), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn display_context_truncates() {
        let ctx = vec!["abcdef".to_string(), "second".to_string()];
        assert_eq!(display_context(&ctx, 3), "abc...");
        assert_eq!(display_context(&ctx, 6), "abcdef");
        assert_eq!(display_context(&[], 10), NO_CONTEXT);
    }
}
