//! Session transcript accumulation.

use serde::{Deserialize, Serialize};

use clinsim_protocols::TurnScores;

/// One doctor question / patient answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Turn index within the session, starting at 0 for the opening
    /// exchange driven by the patient's main complaint.
    pub turn: u32,
    pub question: String,
    pub answer: String,
    pub scores: TurnScores,
}

/// Record of the mid-session crisis event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisReport {
    /// Turn at which the crisis fired.
    pub turn: u32,
    /// The patient's sudden-deterioration description.
    pub crisis: String,
    /// The lead doctor's emergency response.
    pub doctor_answer: String,
    /// The patient's reaction to the doctor's response.
    pub patient_reaction: String,
}

/// Full record of a completed simulation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
    pub crisis: Option<CrisisReport>,
    pub conclusion: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: u32, question: String, answer: String, scores: TurnScores) {
        self.entries.push(TranscriptEntry {
            turn,
            question,
            answer,
            scores,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to pretty-printed JSON for artifact output.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
