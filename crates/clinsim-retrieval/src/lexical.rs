//! Okapi BM25 lexical index.

use std::collections::HashMap;

use tracing::debug;

use crate::chunk::Chunk;

const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Term-frequency ranking structure over a fixed chunk corpus.
///
/// Brute-force: scoring a query walks every chunk, which is fine at the
/// corpus sizes a single case produces. Tokenization is lowercased
/// whitespace splitting, matching how queries are posed upstream.
pub struct Bm25Index {
    term_freqs: Vec<HashMap<String, f32>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

impl Bm25Index {
    /// Build the index over the whole corpus.
    pub fn build(chunks: &[Chunk]) -> Self {
        let docs: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();

        let doc_lens: Vec<f32> = docs.iter().map(|d| d.len() as f32).collect();
        let total_len: f32 = doc_lens.iter().sum();
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len / docs.len() as f32
        };

        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            let mut tf: HashMap<String, f32> = HashMap::new();
            for token in doc {
                *tf.entry(token.clone()).or_insert(0.0) += 1.0;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = docs.len() as f32;
        let idf = doc_freqs
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                // +1 smoothing keeps the IDF positive for ubiquitous terms.
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        debug!(chunks = docs.len(), "built BM25 index");

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    /// Relevance score for the query against every chunk, aligned with
    /// corpus order. Higher is more relevant.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let query_terms = tokenize(query);
        self.term_freqs
            .iter()
            .enumerate()
            .map(|(i, tf)| {
                let dl = self.doc_lens[i];
                query_terms
                    .iter()
                    .map(|term| {
                        let freq = tf.get(term).copied().unwrap_or(0.0);
                        if freq == 0.0 {
                            return 0.0;
                        }
                        let idf = self.idf.get(term).copied().unwrap_or(0.0);
                        let denom = freq + K1 * (1.0 - B + B * dl / self.avg_doc_len.max(1e-6));
                        idf * freq * (K1 + 1.0) / denom
                    })
                    .sum()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_empty_corpus() {
        let index = Bm25Index::build(&[]);
        assert!(index.is_empty());
        assert!(index.scores("anything").is_empty());
    }

    #[test]
    fn test_scores_aligned_with_corpus() {
        let chunks = corpus(&["fever and cough", "headache only", "chest pain"]);
        let index = Bm25Index::build(&chunks);
        let scores = index.scores("cough");

        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_rarer_term_scores_higher() {
        let chunks = corpus(&[
            "cough cough common word",
            "common word here",
            "common word there",
        ]);
        let index = Bm25Index::build(&chunks);

        let rare = index.scores("cough");
        let ubiquitous = index.scores("common");
        assert!(rare[0] > ubiquitous[0]);
    }

    #[test]
    fn test_case_insensitive() {
        let chunks = corpus(&["Fever AND Cough"]);
        let index = Bm25Index::build(&chunks);
        assert!(index.scores("fever")[0] > 0.0);
        assert!(index.scores("COUGH")[0] > 0.0);
    }

    #[test]
    fn test_unknown_term_scores_zero() {
        let chunks = corpus(&["fever and cough"]);
        let index = Bm25Index::build(&chunks);
        let scores = index.scores("zebra");
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn test_multi_term_query_accumulates() {
        let chunks = corpus(&["fever and cough", "cough only"]);
        let index = Bm25Index::build(&chunks);
        let both = index.scores("fever cough");
        let one = index.scores("cough");
        assert!(both[0] > one[0]);
    }
}
