pub mod embedding_engine;
pub mod vector_index;

pub use embedding_engine::{Embedder, EmbeddingEngine, EMBEDDING_DIMENSION};
pub use vector_index::{Neighbor, VectorIndex};
