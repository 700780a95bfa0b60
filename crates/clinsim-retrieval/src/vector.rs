//! Vector index over chunk embeddings.

use clinsim_protocols::{Embedder, Embedding};
use tracing::debug;

use crate::chunk::Chunk;
use crate::error::RetrievalError;

/// Brute-force vector index, built once per corpus.
///
/// Distances, not similarities: lower means more similar, mirroring the
/// distance metric of the ANN stores this fronts for.
pub struct VectorIndex {
    entries: Vec<(usize, Embedding)>,
}

impl VectorIndex {
    /// Embed every chunk and build the index.
    pub async fn build(
        chunks: &[Chunk],
        embedder: &dyn Embedder,
    ) -> Result<Self, RetrievalError> {
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = embedder.embed(&chunk.text).await?;
            entries.push((chunk.id, embedding));
        }
        debug!(chunks = entries.len(), "built vector index");
        Ok(Self { entries })
    }

    /// Nearest chunks to the query embedding: `(chunk_id, cosine_distance)`
    /// sorted ascending by distance, at most `limit` results.
    pub fn search(&self, query: &Embedding, limit: usize) -> Vec<(usize, f32)> {
        let mut results: Vec<(usize, f32)> = self
            .entries
            .iter()
            .map(|(id, emb)| (*id, query.cosine_distance(emb)))
            .collect();

        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        results
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
