//! Groups token occurrences by `(document_id, title, word)`.
//!
//! Documents are tokenized and grouped independently on a rayon pool. The
//! per-document groups come back in input order and are merged into the
//! corpus-wide table, so output order is deterministic: groups appear in the
//! order their key was first seen, and contexts keep occurrence order.

use rayon::prelude::*;
use std::collections::HashMap;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::tokenizer::tokenize;
use crate::{DocumentRecord, WordDocStat};

pub struct Aggregator {
    config: PipelineConfig,
    pool: rayon::ThreadPool,
}

impl Aggregator {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = config.workers {
            builder = builder.num_threads(n.max(1));
        }
        let pool = builder.build()?;
        Ok(Self { config, pool })
    }

    /// Blocking aggregation over the whole corpus. Returns only after every
    /// document has been grouped.
    pub fn aggregate(&self, docs: &[DocumentRecord]) -> Vec<WordDocStat> {
        let context_size = self.config.context_size;
        let per_doc: Vec<Vec<WordDocStat>> = self
            .pool
            .install(|| docs.par_iter().map(|doc| group_document(doc, context_size)).collect());

        let mut stats = merge_groups(per_doc);
        if let Some(max) = self.config.max_contexts {
            for stat in stats.iter_mut() {
                stat.contexts.truncate(max);
            }
        }
        tracing::info!(documents = docs.len(), groups = stats.len(), "aggregation complete");
        stats
    }
}

/// Group one document's occurrences by word, in first-seen order.
pub fn group_document(doc: &DocumentRecord, context_size: usize) -> Vec<WordDocStat> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<WordDocStat> = Vec::new();
    for occ in tokenize(&doc.content, context_size) {
        match slots.get(&occ.word) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.frequency += 1;
                group.contexts.push(occ.context);
            }
            None => {
                slots.insert(occ.word.clone(), groups.len());
                groups.push(WordDocStat {
                    document_id: doc.document_id.clone(),
                    title: doc.title.clone(),
                    word: occ.word,
                    frequency: 1,
                    contexts: vec![occ.context],
                });
            }
        }
    }
    groups
}

/// Fold per-document groups into one table keyed by `(document_id, title, word)`.
/// A document id repeated in the corpus lands in the same groups as its first
/// appearance when the title matches too.
fn merge_groups(per_doc: Vec<Vec<WordDocStat>>) -> Vec<WordDocStat> {
    let mut slots: HashMap<(String, String, String), usize> = HashMap::new();
    let mut merged: Vec<WordDocStat> = Vec::new();
    for stat in per_doc.into_iter().flatten() {
        let key = (stat.document_id.clone(), stat.title.clone(), stat.word.clone());
        match slots.get(&key) {
            Some(&slot) => {
                let group = &mut merged[slot];
                group.frequency += stat.frequency;
                group.contexts.extend(stat.contexts);
            }
            None => {
                slots.insert(key, merged.len());
                merged.push(stat);
            }
        }
    }
    merged
}
