use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::corpus::numbered_lines;
use crate::error::{Error, Result};
use crate::DocumentRecord;

/// Total word count of each document body, keyed by document id. Counts are
/// stored as read; non-positive ones are only clamped when used as a divisor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLengths {
    counts: HashMap<String, i64>,
}

/// Words in a cleaned body: ASCII punctuation removed, then split on whitespace.
pub fn count_words(content: &str) -> u64 {
    content
        .split_whitespace()
        .filter(|w| w.chars().any(|c| !c.is_ascii_punctuation()))
        .count() as u64
}

impl DocumentLengths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: &[DocumentRecord]) -> Self {
        let mut lengths = Self::new();
        for doc in docs {
            lengths.insert(doc.document_id.clone(), count_words(&doc.content) as i64);
        }
        lengths
    }

    /// Later inserts for the same id win.
    pub fn insert(&mut self, document_id: String, count: i64) {
        self.counts.insert(document_id, count);
    }

    pub fn get(&self, document_id: &str) -> Option<i64> {
        self.counts.get(document_id).copied()
    }

    /// Length used as the tf denominator: missing or zero lengths count as 1.
    pub fn denominator(&self, document_id: &str) -> u64 {
        self.get(document_id).unwrap_or(1).max(1) as u64
    }

    /// Number of documents, the `N` of idf.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Parse `documentId:count` lines. Malformed lines are logged and skipped.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut lengths = Self::new();
        let mut skipped = 0usize;
        for item in numbered_lines(reader) {
            let (line_no, line) = item?;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, "skipping document length");
                    continue;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line, line_no) {
                Ok((id, count)) => lengths.insert(id, count),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(error = %e, line, "skipping document length");
                }
            }
        }
        tracing::info!(documents = lengths.len(), skipped, "loaded document lengths");
        Ok(lengths)
    }

    /// Write in `documentId:count` form, sorted by id.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut ids: Vec<&String> = self.counts.keys().collect();
        ids.sort();
        for id in ids {
            writeln!(writer, "{}:{}", id, self.counts[id])?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<(String, i64)> {
    let (id, count) = line
        .split_once(':')
        .ok_or_else(|| Error::malformed(line_no, "missing ':' separator"))?;
    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::malformed(line_no, format!("invalid count '{}'", count.trim())))?;
    Ok((id.trim().to_string(), count))
}
