//! Experience record shapes.

use clinsim_protocols::Embedding;
use serde::{Deserialize, Serialize};

/// A stored patient exemplar: one question answered from retrieved
/// context, plus the style requirements extracted from that exchange.
/// Append-only; never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub key_embedding: Embedding,
    pub question: String,
    pub context: String,
    pub answer: String,
    pub requirements: String,
}

/// A stored doctor exemplar: two chained questions with their answers and
/// grounding contexts. Both question embeddings are kept; dedup and
/// lookup each apply their own threshold per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorExchange {
    pub question1: String,
    pub key1: Embedding,
    pub context1: String,
    pub answer1: String,
    pub key2: Embedding,
    pub question2: String,
    pub answer2: String,
    pub context2: String,
}
