//! Answer-quality assessment collaborator.
//!
//! The scoring rubric itself is external to this system; the core only
//! consumes its verdicts through this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Quality scores for one generated turn.
///
/// `composite` gates experience-store write-back; the auxiliary scores are
/// carried through per-node state and logged but never interpreted by the
/// core.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TurnScores {
    pub composite: f32,
    pub relevance: f32,
    pub faithfulness: f32,
    pub human_likeness: f32,
}

impl TurnScores {
    pub fn new(composite: f32, relevance: f32, faithfulness: f32, human_likeness: f32) -> Self {
        Self {
            composite,
            relevance,
            faithfulness,
            human_likeness,
        }
    }
}

/// External collaborator that grades generated answers.
#[async_trait]
pub trait Assessor: Send + Sync {
    /// Grade a patient answer against the question, the retrieved context
    /// and the patient profile.
    async fn assess_patient(
        &self,
        question: &str,
        context: &str,
        answer: &str,
        profile: &str,
    ) -> Result<TurnScores, OracleError>;

    /// Grade a doctor question/answer exchange against the retrieved
    /// context. `human_likeness` is not produced for doctor turns.
    async fn assess_doctor(
        &self,
        question: &str,
        context: &str,
        answer: &str,
    ) -> Result<TurnScores, OracleError>;
}
