// Topic relevance — vocabulary matching and semantic near-duplicate detection.

pub mod classifier;
pub mod embeddings;
pub mod vocabulary;

pub use classifier::{Relevance, TopicClassifier};
pub use embeddings::{find_duplicate, Embedder, EmbeddingCache, SemanticMatch};
