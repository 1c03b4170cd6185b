use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::stopwords::StopwordFilter;
use crate::{Posting, WordDocStat};

/// Word -> postings, one posting per document containing the word. Posting
/// order is insertion order and carries no relevance meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    entries: HashMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Postings for an already case-folded word.
    pub fn postings(&self, word: &str) -> Option<&[Posting]> {
        self.entries.get(word).map(Vec::as_slice)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Number of distinct indexed words.
    pub fn num_terms(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Accumulates [`WordDocStat`]s into an [`InvertedIndex`].
pub struct IndexBuilder<'a, S: StopwordFilter + ?Sized> {
    stopwords: &'a S,
    entries: HashMap<String, Vec<Posting>>,
    seen: HashSet<(String, String)>,
    skipped_stopwords: usize,
}

impl<'a, S: StopwordFilter + ?Sized> IndexBuilder<'a, S> {
    pub fn new(stopwords: &'a S) -> Self {
        Self { stopwords, entries: HashMap::new(), seen: HashSet::new(), skipped_stopwords: 0 }
    }

    pub fn push(&mut self, stat: WordDocStat) -> Result<()> {
        let word = stat.word.to_lowercase();
        if self.stopwords.is_stopword(&word) {
            self.skipped_stopwords += 1;
            return Ok(());
        }
        if stat.frequency == 0 {
            tracing::debug!(%word, document_id = %stat.document_id, "ignoring zero-frequency record");
            return Ok(());
        }
        if !self.seen.insert((word.clone(), stat.document_id.clone())) {
            return Err(Error::DuplicatePosting { word, document_id: stat.document_id });
        }
        self.entries.entry(word).or_default().push(Posting::from(stat));
        Ok(())
    }

    pub fn extend<I>(&mut self, stats: I) -> Result<()>
    where
        I: IntoIterator<Item = WordDocStat>,
    {
        for stat in stats {
            self.push(stat)?;
        }
        Ok(())
    }

    pub fn finish(self) -> InvertedIndex {
        tracing::info!(
            num_terms = self.entries.len(),
            postings = self.seen.len(),
            skipped_stopwords = self.skipped_stopwords,
            "inverted index built"
        );
        InvertedIndex { entries: self.entries }
    }
}

/// Build an index from a complete set of aggregates. Fails on the first
/// duplicate posting; no partial index is returned.
pub fn build_index<I, S>(stats: I, stopwords: &S) -> Result<InvertedIndex>
where
    I: IntoIterator<Item = WordDocStat>,
    S: StopwordFilter + ?Sized,
{
    let mut builder = IndexBuilder::new(stopwords);
    builder.extend(stats)?;
    Ok(builder.finish())
}
