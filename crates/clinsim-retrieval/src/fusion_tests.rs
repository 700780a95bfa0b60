use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clinsim_protocols::{Embedder, Embedding, HashEmbedder, OracleError};

use super::*;
use crate::chunk::Chunk;

fn corpus(texts: &[&str]) -> Vec<Chunk> {
    texts
        .iter()
        .enumerate()
        .map(|(id, t)| Chunk {
            id,
            text: t.to_string(),
        })
        .collect()
}

/// Embedder with fixed vectors per text; unknown texts get a zero vector.
struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl StaticEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self {
            vectors: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    fn id(&self) -> &str {
        "static"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, OracleError> {
        let vector = self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]);
        Ok(Embedding::new(vector))
    }
}

async fn build_retriever(
    texts: &[&str],
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
) -> HybridRetriever {
    HybridRetriever::from_chunks(corpus(texts), embedder, config)
        .await
        .unwrap()
}

#[test]
fn test_normalize_constant_vector_is_zeros() {
    let normalized = min_max_normalize(&[2.5, 2.5, 2.5]);
    assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
    assert!(normalized.iter().all(|v| !v.is_nan()));
}

#[test]
fn test_normalize_range() {
    let normalized = min_max_normalize(&[1.0, 3.0, 2.0]);
    assert_eq!(normalized, vec![0.0, 1.0, 0.5]);
}

#[test]
fn test_normalize_empty() {
    assert!(min_max_normalize(&[]).is_empty());
}

#[tokio::test]
async fn test_fused_scores_within_unit_interval() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let retriever = build_retriever(
        &["fever and cough", "headache only", "chest pain", "no fever"],
        embedder,
        RetrieverConfig::default(),
    )
    .await;

    for alpha in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let scored = retriever.score("cough and fever", alpha).await.unwrap();
        for s in &scored {
            assert!(s.fused >= 0.0 && s.fused <= 1.0, "fused {} out of range", s.fused);
        }
    }
}

#[tokio::test]
async fn test_empty_corpus_returns_empty() {
    let embedder = Arc::new(HashEmbedder::new(32));
    let retriever = HybridRetriever::from_chunks(Vec::new(), embedder, RetrieverConfig::default())
        .await
        .unwrap();
    let results = retriever.retrieve_with("cough", 5, 0.5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_k_larger_than_corpus_returns_all_sorted() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let retriever = build_retriever(
        &["fever and cough", "headache only"],
        embedder,
        RetrieverConfig::default(),
    )
    .await;

    let results = retriever.retrieve_with("cough", 10, 0.5).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_alpha_extremes_follow_single_ranking() {
    // Lexical favors chunk 0 ("cough" appears only there); the static
    // vectors favor chunk 1. The two rankings provably differ.
    let embedder = Arc::new(StaticEmbedder::new(&[
        ("cough here", vec![0.0, 1.0]),
        ("nothing at all", vec![1.0, 0.0]),
        ("cough", vec![0.95, 0.3]),
    ]));
    let retriever = build_retriever(
        &["cough here", "nothing at all"],
        embedder,
        RetrieverConfig::default(),
    )
    .await;

    let lexical_only = retriever.retrieve_with("cough", 2, 0.0).await.unwrap();
    assert_eq!(lexical_only[0].id, 0);

    let vector_only = retriever.retrieve_with("cough", 2, 1.0).await.unwrap();
    assert_eq!(vector_only[0].id, 1);
}

#[tokio::test]
async fn test_cough_scenario_favors_chunk_zero() {
    let embedder = Arc::new(HashEmbedder::new(128));
    let retriever = build_retriever(
        &["fever and cough", "headache only", "chest pain"],
        embedder,
        RetrieverConfig::default(),
    )
    .await;

    let results = retriever.retrieve_with("cough", 3, 0.5).await.unwrap();
    assert_eq!(results[0].id, 0);
}

#[tokio::test]
async fn test_absent_vector_candidates_rank_last() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let config = RetrieverConfig {
        alpha: 1.0,
        top_k: 3,
        vector_candidates: Some(1),
    };
    let retriever = build_retriever(
        &["fever and cough", "headache only", "chest pain"],
        embedder,
        config,
    )
    .await;

    // Only one vector candidate survives; the rest take the fallback
    // distance and must sort below it under pure-vector weighting.
    let scored = retriever.score("fever and cough", 1.0).await.unwrap();
    let best = scored
        .iter()
        .max_by(|a, b| a.fused.partial_cmp(&b.fused).unwrap())
        .unwrap();
    assert_eq!(best.chunk_id, 0);
    let worst_count = scored.iter().filter(|s| s.vector == 0.0).count();
    assert_eq!(worst_count, 2);
}

#[tokio::test]
async fn test_ties_keep_corpus_order() {
    // Query matches nothing: all lexical zeros, all vector distances
    // equal (same fallback) — every fused score ties.
    let embedder = Arc::new(StaticEmbedder::new(&[("zebra", vec![1.0, 0.0])]));
    let retriever = build_retriever(
        &["aaa bbb", "ccc ddd", "eee fff"],
        embedder,
        RetrieverConfig::default(),
    )
    .await;

    let results = retriever.retrieve_with("zebra", 3, 0.5).await.unwrap();
    let ids: Vec<usize> = results.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_grounding_concatenates_chunk_texts() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let retriever = build_retriever(
        &["fever and cough", "headache only", "chest pain"],
        embedder,
        RetrieverConfig {
            top_k: 1,
            ..Default::default()
        },
    )
    .await;

    let grounding = retriever.grounding("cough").await.unwrap();
    assert_eq!(grounding, "fever and cough");
}
