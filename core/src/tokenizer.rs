use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Maximal runs of word characters (Unicode letters, digits, underscore).
    static ref WORD_RE: Regex = Regex::new(r"\w+").expect("valid regex");
}

/// One token occurrence together with its surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOccurrence {
    pub word: String,
    pub position: usize,
    pub context: String,
}

/// Lowercase `content` and split it into word tokens.
pub fn words(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    WORD_RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Tokenize `content` and yield every occurrence with a context window of up
/// to `context_size` tokens on each side, clamped at the document edges.
pub fn tokenize(content: &str, context_size: usize) -> ContextWindows {
    ContextWindows { tokens: words(content), context_size, next: 0 }
}

/// Lazy iterator returned by [`tokenize`]. Windows are built on demand.
#[derive(Debug, Clone)]
pub struct ContextWindows {
    tokens: Vec<String>,
    context_size: usize,
    next: usize,
}

impl ContextWindows {
    /// Total number of tokens in the document, consumed or not.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn window(&self, i: usize) -> String {
        let start = i.saturating_sub(self.context_size);
        let end = i.saturating_add(self.context_size).saturating_add(1).min(self.tokens.len());
        self.tokens[start..end].join(" ")
    }
}

impl Iterator for ContextWindows {
    type Item = TokenOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.next;
        let word = self.tokens.get(i)?.clone();
        self.next += 1;
        Some(TokenOccurrence { word, position: i, context: self.window(i) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.tokens.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ContextWindows {}
