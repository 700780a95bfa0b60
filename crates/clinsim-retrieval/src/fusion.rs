//! Score fusion and the hybrid retriever.

use std::sync::Arc;

use clinsim_protocols::Embedder;
use tracing::debug;

use crate::chunk::{Chunk, ChunkerConfig, chunk_text};
use crate::error::RetrievalError;
use crate::lexical::Bm25Index;
use crate::vector::VectorIndex;

/// Configuration for hybrid retrieval.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Weight for vector similarity (0.0 - 1.0).
    /// Lexical scores get weight (1.0 - alpha).
    pub alpha: f32,
    /// Default number of chunks returned.
    pub top_k: usize,
    /// How many vector candidates to consider per query; `None` means the
    /// whole corpus. Chunks outside the candidate set fall back to the
    /// worst observed distance plus one.
    pub vector_candidates: Option<usize>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            top_k: 2,
            vector_candidates: None,
        }
    }
}

/// Per-query scoring of a single chunk.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: usize,
    pub lexical: f32,
    pub vector: f32,
    pub fused: f32,
}

/// Fuses BM25 and vector rankings over one fixed corpus.
pub struct HybridRetriever {
    chunks: Vec<Chunk>,
    lexical: Bm25Index,
    vectors: VectorIndex,
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

/// Min-max normalize into [0,1]; a constant vector maps to all zeros
/// rather than dividing by zero.
pub fn min_max_normalize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == min {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

impl HybridRetriever {
    /// Chunk the content and build both indexes over it.
    pub async fn build(
        content: &str,
        embedder: Arc<dyn Embedder>,
        chunker: &ChunkerConfig,
        config: RetrieverConfig,
    ) -> Result<Self, RetrievalError> {
        let chunks = chunk_text(content, chunker);
        Self::from_chunks(chunks, embedder, config).await
    }

    /// Build over pre-chunked text.
    pub async fn from_chunks(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
        config: RetrieverConfig,
    ) -> Result<Self, RetrievalError> {
        let lexical = Bm25Index::build(&chunks);
        let vectors = VectorIndex::build(&chunks, embedder.as_ref()).await?;
        Ok(Self {
            chunks,
            lexical,
            vectors,
            embedder,
            config,
        })
    }

    pub fn corpus(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Score every chunk for the query.
    pub async fn score(&self, query: &str, alpha: f32) -> Result<Vec<ScoredChunk>, RetrievalError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let lexical_raw = self.lexical.scores(query);
        if lexical_raw.len() != self.chunks.len() {
            // Lexical absence of a corpus chunk is a programming error.
            return Err(RetrievalError::CorpusMismatch {
                expected: self.chunks.len(),
                actual: lexical_raw.len(),
            });
        }

        let query_emb = self.embedder.embed(query).await?;
        let limit = self.config.vector_candidates.unwrap_or(self.chunks.len());
        let candidates = self.vectors.search(&query_emb, limit);

        // Align distances with corpus order; absent candidates get the
        // worst observed distance plus one so they rank last.
        let fallback = candidates
            .iter()
            .map(|(_, d)| *d)
            .fold(f32::NEG_INFINITY, f32::max);
        let fallback = if candidates.is_empty() {
            1.0
        } else {
            fallback + 1.0
        };
        let mut distances = vec![fallback; self.chunks.len()];
        for (id, dist) in &candidates {
            distances[*id] = *dist;
        }

        let norm_lexical = min_max_normalize(&lexical_raw);
        let norm_distance = min_max_normalize(&distances);

        let scored = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let similarity = 1.0 - norm_distance[i];
                ScoredChunk {
                    chunk_id: chunk.id,
                    lexical: norm_lexical[i],
                    vector: similarity,
                    fused: alpha * similarity + (1.0 - alpha) * norm_lexical[i],
                }
            })
            .collect();

        Ok(scored)
    }

    /// Top-k chunks by fused score; stable tie-break by corpus order.
    pub async fn retrieve_with(
        &self,
        query: &str,
        k: usize,
        alpha: f32,
    ) -> Result<Vec<&Chunk>, RetrievalError> {
        let mut scored = self.score(query, alpha).await?;
        // Stable sort keeps corpus order among equal fused scores.
        scored.sort_by(|a, b| b.fused.partial_cmp(&a.fused).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(query, k, alpha, returned = scored.len(), "hybrid retrieval");
        Ok(scored.iter().map(|s| &self.chunks[s.chunk_id]).collect())
    }

    /// Top-k chunks using the configured defaults.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<&Chunk>, RetrievalError> {
        self.retrieve_with(query, self.config.top_k, self.config.alpha)
            .await
    }

    /// Retrieved chunk texts concatenated into one grounding context block.
    pub async fn grounding(&self, query: &str) -> Result<String, RetrievalError> {
        let chunks = self.retrieve(query).await?;
        Ok(chunks.iter().map(|c| c.text.as_str()).collect())
    }
}

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;
