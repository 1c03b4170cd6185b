use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_SIZE: usize = 3;

/// Knobs for the tokenize/aggregate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tokens kept on each side of an occurrence in its context window.
    pub context_size: usize,
    /// Keep at most this many contexts per (document, word) group.
    pub max_contexts: Option<usize>,
    /// Worker threads for per-document processing; `None` uses all cores.
    pub workers: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { context_size: DEFAULT_CONTEXT_SIZE, max_contexts: None, workers: None }
    }
}

impl PipelineConfig {
    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }
}
