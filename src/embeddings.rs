use crate::chunking::TextChunk;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Dimension of `text-embedding-3-small` vectors
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Fail if this vector does not have the expected dimension
    pub fn ensure_dimension(&self, expected: usize) -> Result<()> {
        if self.dimension() != expected {
            return Err(anyhow::anyhow!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected,
                self.dimension()
            ));
        }
        Ok(())
    }
}

/// Anything that can turn text into an embedding vector.
///
/// The same provider must be used for chunks and queries so that distances
/// between them are comparable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a text
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Generate embeddings for every chunk, in chunk order
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[TextChunk],
    dimension: usize,
) -> Result<Vec<Embedding>> {
    let mut embeddings = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let embedding = provider.embed(&chunk.text).await?;
        embedding.ensure_dimension(dimension)?;
        embeddings.push(embedding);
    }

    Ok(embeddings)
}
