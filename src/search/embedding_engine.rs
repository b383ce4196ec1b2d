use model2vec_rs::model::StaticModel;

use crate::error::AdvisorError;

const EMBEDDING_MODEL_ID: &str = "minishlab/potion-base-32M";

pub const EMBEDDING_DIMENSION: usize = 512;

/// Text-to-vector provider. One batch call per vocabulary, one call per
/// query phrase; implementations must be deterministic for a fixed model.
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, AdvisorError> {
        let embeddings = self.embed(&[text.to_string()])?;
        embeddings.into_iter().next().ok_or_else(|| {
            AdvisorError::EmbeddingService(format!("no embedding returned for text: {}", text))
        })
    }

    fn dimension(&self) -> usize;
}

pub struct EmbeddingEngine {
    model: StaticModel,
}

impl EmbeddingEngine {
    pub fn new() -> Result<Self, AdvisorError> {
        // Defaults: no HF token, model-default normalization, no subfolder.
        let model = StaticModel::from_pretrained(EMBEDDING_MODEL_ID, None, None, None)
            .map_err(|e| AdvisorError::EmbeddingService(e.to_string()))?;
        Ok(Self { model })
    }
}

impl Embedder for EmbeddingEngine {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        Ok(self.model.encode(texts))
    }

    fn dimension(&self) -> usize {
        // model2vec-rs does not expose the dimension of the loaded model;
        // this matches the published potion-base-32M model card.
        EMBEDDING_DIMENSION
    }
}
