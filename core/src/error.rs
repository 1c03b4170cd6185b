use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the indexing pipeline and the query layer.
///
/// A term missing from the index is not an error; see
/// [`SearchOutcome::NotFound`](crate::SearchOutcome::NotFound).
#[derive(Debug, Error)]
pub enum Error {
    /// A record failed structural parsing. Readers log and skip these.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("missing resource: {}", .path.display())]
    MissingResource { path: PathBuf },
    /// The same word/document pair produced two postings. Points at a
    /// grouping bug upstream, so the build is aborted.
    #[error("duplicate posting for word '{word}' in document '{document_id}'")]
    DuplicatePosting { word: String, document_id: String },
    #[error("document length table is empty, cannot compute idf")]
    EmptyCorpus,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index encoding error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord { line, reason: reason.into() }
    }
}
