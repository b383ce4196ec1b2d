pub mod embedding;
pub mod lexical;

pub use embedding::EmbeddingMatcher;
pub use lexical::LexicalMatcher;

use crate::error::AdvisorError;

/// Reference default for the number of candidate labels per query.
/// A tuning constant, not tuned for accuracy; callers may override it.
pub const DEFAULT_TOP_N: usize = 3;

/// Maps a free-text symptom phrase onto the canonical label vocabulary.
///
/// The two strategies (embedding-based, lexical) are interchangeable
/// behind this contract; a session selects exactly one at construction.
pub trait SymptomMatcher: Send + Sync {
    /// Returns at most `min(top_n, vocabulary size)` labels, most similar
    /// first, without duplicates. Deterministic for a fixed matcher.
    fn resolve(&self, phrase: &str, top_n: usize) -> Result<Vec<String>, AdvisorError>;

    /// The vocabulary this matcher was built over, in slot order.
    fn vocabulary(&self) -> &[String];
}

/// Rejects `top_n < 1` before any work happens, and clamps it to the
/// vocabulary size (never padded, never an error).
pub(crate) fn effective_top_n(top_n: usize, vocabulary_len: usize) -> Result<usize, AdvisorError> {
    if top_n < 1 {
        return Err(AdvisorError::InvalidQueryParameter(format!(
            "top_n must be >= 1, got {}",
            top_n
        )));
    }
    Ok(top_n.min(vocabulary_len))
}

/// Vocabulary invariant: deduplicated before indexing, first occurrence
/// wins so slot order follows store order.
pub(crate) fn dedup_preserving_order(labels: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.clone()))
        .collect()
}
