//! Deterministic oracle doubles.
//!
//! The session is only testable if every oracle can be replaced by a
//! deterministic in-process implementation; these are the reference
//! doubles used across the workspace's test suites and by the CLI's
//! offline mode.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::assess::{Assessor, TurnScores};
use crate::embedding::Embedding;
use crate::error::OracleError;
use crate::oracle::{Embedder, LanguageModel};

/// Language model that replays a scripted queue of responses.
///
/// Once the queue is exhausted every call returns the fallback response.
/// Prompts are recorded for assertion.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Model that answers every prompt with the same text.
    pub fn always(response: impl Into<String>) -> Self {
        Self::new(Vec::new(), response)
    }

    /// Prompts seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    /// Number of generate calls made.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        let next = self
            .responses
            .lock()
            .expect("response queue poisoned")
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Hash-based embedding for tests and offline runs (not semantic).
///
/// Word-level hashing distributed across the vector, then normalized;
/// identical texts always embed identically, texts sharing words land
/// closer than unrelated ones.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_text(&self, text: &str) -> Embedding {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            for j in 0..self.dimension {
                let val = ((hash >> (j % 64)) & 0xFF) as f32 / 255.0 - 0.5;
                vector[j] += val;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Embedding::new(vector)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, OracleError> {
        let text = if text.is_empty() { "None" } else { text };
        Ok(self.hash_text(text))
    }
}

/// Assessor that returns the same scores for every turn.
pub struct NeutralAssessor {
    scores: TurnScores,
}

impl NeutralAssessor {
    pub fn new(scores: TurnScores) -> Self {
        Self { scores }
    }

    /// Assessor whose composite score always passes a given gate.
    pub fn passing(composite: f32) -> Self {
        Self::new(TurnScores::new(composite, composite, composite, composite))
    }
}

impl Default for NeutralAssessor {
    fn default() -> Self {
        Self::new(TurnScores::default())
    }
}

#[async_trait]
impl Assessor for NeutralAssessor {
    async fn assess_patient(
        &self,
        _question: &str,
        _context: &str,
        _answer: &str,
        _profile: &str,
    ) -> Result<TurnScores, OracleError> {
        Ok(self.scores)
    }

    async fn assess_doctor(
        &self,
        _question: &str,
        _context: &str,
        _answer: &str,
    ) -> Result<TurnScores, OracleError> {
        Ok(self.scores)
    }
}
