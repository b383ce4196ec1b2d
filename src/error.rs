use std::error::Error;
use std::fmt;

use crate::generation::connection::GenerationError;
use crate::graph_store::client::GraphStoreError;

/// Crate-level error, tagged by the pipeline stage that failed.
///
/// Construction-time kinds (`EmptyVocabulary`, `DimensionMismatch`) abort
/// session setup. Per-request kinds are surfaced to the caller, which owns
/// the retry decision. `InvalidQueryParameter` is rejected before any I/O.
#[derive(Debug)]
pub enum AdvisorError {
    EmptyVocabulary,
    DimensionMismatch {
        expected: usize,
        found: usize,
    },
    InvalidQueryParameter(String),
    StoreUnavailable(GraphStoreError),
    EmbeddingService(String),
    GenerationService(GenerationError),
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorError::EmptyVocabulary => {
                write!(f, "symptom vocabulary is empty, cannot build an index")
            }
            AdvisorError::DimensionMismatch { expected, found } => {
                write!(
                    f,
                    "embedding dimension mismatch: expected {}, found {}",
                    expected, found
                )
            }
            AdvisorError::InvalidQueryParameter(msg) => {
                write!(f, "invalid query parameter: {}", msg)
            }
            AdvisorError::StoreUnavailable(err) => {
                write!(f, "graph store request failed: {}", err)
            }
            AdvisorError::EmbeddingService(msg) => {
                write!(f, "embedding service failed: {}", msg)
            }
            AdvisorError::GenerationService(err) => {
                write!(f, "generation service failed: {}", err)
            }
        }
    }
}

impl Error for AdvisorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AdvisorError::StoreUnavailable(err) => Some(err),
            AdvisorError::GenerationService(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphStoreError> for AdvisorError {
    fn from(err: GraphStoreError) -> Self {
        AdvisorError::StoreUnavailable(err)
    }
}

impl From<GenerationError> for AdvisorError {
    fn from(err: GenerationError) -> Self {
        AdvisorError::GenerationService(err)
    }
}
