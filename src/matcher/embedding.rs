use crate::error::AdvisorError;
use crate::matcher::{dedup_preserving_order, effective_top_n, SymptomMatcher};
use crate::search::{Embedder, VectorIndex};

// Labels and query phrases carry different semantic roles, so each side
// gets its own sentence context before embedding. Both are fixed design
// constants, not user-configurable.
fn label_context(label: &str) -> String {
    format!("symptoms of {}", label.to_lowercase())
}

fn phrase_context(phrase: &str) -> String {
    format!("patient describes symptoms: {}", phrase.to_lowercase())
}

/// Embedding + nearest-neighbour matcher: the vocabulary is embedded once
/// (one batch call) into a [`VectorIndex`]; each query embeds the phrase
/// and retrieves the top-k slots under the angular metric.
pub struct EmbeddingMatcher {
    embedder: Box<dyn Embedder + Send + Sync>,
    index: VectorIndex,
    vocabulary: Vec<String>,
}

impl EmbeddingMatcher {
    pub fn new(
        embedder: Box<dyn Embedder + Send + Sync>,
        vocabulary: Vec<String>,
    ) -> Result<Self, AdvisorError> {
        let vocabulary = dedup_preserving_order(vocabulary);
        if vocabulary.is_empty() {
            return Err(AdvisorError::EmptyVocabulary);
        }

        let contexts: Vec<String> = vocabulary.iter().map(|l| label_context(l)).collect();
        let embeddings = embedder.embed(&contexts)?;
        if embeddings.len() != vocabulary.len() {
            return Err(AdvisorError::EmbeddingService(format!(
                "embedded {} of {} vocabulary labels",
                embeddings.len(),
                vocabulary.len()
            )));
        }

        let index = VectorIndex::build(&embeddings)?;
        Ok(Self {
            embedder,
            index,
            vocabulary,
        })
    }
}

impl SymptomMatcher for EmbeddingMatcher {
    fn resolve(&self, phrase: &str, top_n: usize) -> Result<Vec<String>, AdvisorError> {
        let k = effective_top_n(top_n, self.vocabulary.len())?;
        let query = self.embedder.embed_one(&phrase_context(phrase))?;
        let neighbors = self.index.nearest(&query, k)?;
        Ok(neighbors
            .into_iter()
            .map(|n| self.vocabulary[n.slot].clone())
            .collect())
    }

    fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }
}
