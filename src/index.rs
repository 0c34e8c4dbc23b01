use crate::embeddings::Embedding;
use anyhow::Result;

/// One search result: a chunk position and its distance from the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub chunk_index: usize,
    pub distance: f32,
}

/// Read-only nearest-neighbour lookup over chunk embeddings
pub trait NearestNeighbors: Send + Sync {
    /// Number of indexed vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension every indexed vector shares
    fn dimension(&self) -> usize;

    /// Return up to `k` hits ordered nearest first
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>>;
}

/// Brute-force index comparing the query against every stored vector.
///
/// Suitable for documents with a few dozen chunks. Vectors are stored in
/// chunk order, so position `i` holds the embedding of chunk `i`.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build an index from chunk embeddings in chunk order
    pub fn build(dimension: usize, embeddings: Vec<Embedding>) -> Result<Self> {
        let mut vectors = Vec::with_capacity(embeddings.len());

        for (idx, embedding) in embeddings.into_iter().enumerate() {
            embedding
                .ensure_dimension(dimension)
                .map_err(|e| anyhow::anyhow!("Chunk {}: {}", idx, e))?;
            vectors.push(embedding.values);
        }

        Ok(FlatIndex { dimension, vectors })
    }
}

impl NearestNeighbors for FlatIndex {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>> {
        query.ensure_dimension(self.dimension)?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(chunk_index, vector)| SearchHit {
                chunk_index,
                distance: euclidean_distance(&query.values, vector),
            })
            .collect();

        // Stable sort keeps lower chunk indices first on equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        Ok(hits)
    }
}

/// L2 distance between two vectors of equal length
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
