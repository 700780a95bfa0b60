//! Embedding-deduplicated experience stores.
//!
//! Both stores are append-only in-memory collections keyed by question
//! embeddings. Inserts are gated by cosine similarity against existing
//! records; a rejected insert is `Ok(false)`, never an error. Lookups
//! return at most two exemplars, ranked by similarity.

use std::sync::Arc;

use clinsim_protocols::{Embedder, Embedding};
use tracing::debug;

use crate::error::StoreError;
use crate::record::{DoctorExchange, ExperienceRecord};

/// Thresholds for the patient store.
#[derive(Debug, Clone, Copy)]
pub struct PatientStoreConfig {
    /// Inserts whose key similarity to any existing record exceeds this
    /// are dropped as duplicates.
    pub dedup_threshold: f32,
    /// Minimum similarity for a record to count as a lookup candidate.
    pub lookup_threshold: f32,
}

impl Default for PatientStoreConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.95,
            lookup_threshold: 0.9,
        }
    }
}

/// Thresholds for the doctor store.
#[derive(Debug, Clone, Copy)]
pub struct DoctorStoreConfig {
    /// An insert is a duplicate only when BOTH question keys exceed this
    /// against the same existing record.
    pub dedup_threshold: f32,
    /// Lookup candidates are matched on the first question key only.
    pub lookup_threshold: f32,
}

impl Default for DoctorStoreConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.8,
            lookup_threshold: 0.25,
        }
    }
}

/// Candidates above the threshold collapse to at most two exemplars:
/// more than two candidates keep the top two, one or two keep only the
/// best, none yield an empty set.
fn select_exemplars<T: Clone>(mut scored: Vec<(f32, T)>) -> Vec<T> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let keep = match scored.len() {
        0 => 0,
        1 | 2 => 1,
        _ => 2,
    };
    scored.truncate(keep);
    scored.into_iter().map(|(_, record)| record).collect()
}

/// Store of question/answer exemplars accumulated by the patient agent.
pub struct PatientEvolveStore {
    embedder: Arc<dyn Embedder>,
    config: PatientStoreConfig,
    records: Vec<ExperienceRecord>,
}

impl PatientEvolveStore {
    pub fn new(embedder: Arc<dyn Embedder>, config: PatientStoreConfig) -> Self {
        Self {
            embedder,
            config,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExperienceRecord] {
        &self.records
    }

    /// Inserts the exchange unless a near-duplicate question is already
    /// stored. Returns whether the record was kept.
    pub async fn try_store(
        &mut self,
        question: &str,
        context: &str,
        answer: &str,
        requirements: &str,
    ) -> Result<bool, StoreError> {
        let key = self.embedder.embed(question).await?;
        for existing in &self.records {
            let similarity = key.cosine_similarity(&existing.key_embedding);
            if similarity > self.config.dedup_threshold {
                debug!(similarity, "patient record rejected as duplicate");
                return Ok(false);
            }
        }
        self.records.push(ExperienceRecord {
            key_embedding: key,
            question: question.to_string(),
            context: context.to_string(),
            answer: answer.to_string(),
            requirements: requirements.to_string(),
        });
        Ok(true)
    }

    /// Returns the most related stored exchanges for a new question.
    pub async fn lookup(&self, question: &str) -> Result<Vec<ExperienceRecord>, StoreError> {
        let key = self.embedder.embed(question).await?;
        Ok(self.lookup_by_key(&key))
    }

    pub fn lookup_by_key(&self, key: &Embedding) -> Vec<ExperienceRecord> {
        let scored = self
            .records
            .iter()
            .filter_map(|record| {
                let similarity = key.cosine_similarity(&record.key_embedding);
                (similarity > self.config.lookup_threshold).then(|| (similarity, record.clone()))
            })
            .collect();
        select_exemplars(scored)
    }
}

/// Store of question-pair exchanges accumulated by doctor agents.
pub struct DoctorEvolveStore {
    embedder: Arc<dyn Embedder>,
    config: DoctorStoreConfig,
    records: Vec<DoctorExchange>,
}

impl DoctorEvolveStore {
    pub fn new(embedder: Arc<dyn Embedder>, config: DoctorStoreConfig) -> Self {
        Self {
            embedder,
            config,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DoctorExchange] {
        &self.records
    }

    /// Inserts the two-question exchange unless an existing record matches
    /// on both keys.
    pub async fn try_store(
        &mut self,
        question1: &str,
        context1: &str,
        answer1: &str,
        question2: &str,
        answer2: &str,
        context2: &str,
    ) -> Result<bool, StoreError> {
        let key1 = self.embedder.embed(question1).await?;
        let key2 = self.embedder.embed(question2).await?;
        for existing in &self.records {
            let sim1 = key1.cosine_similarity(&existing.key1);
            let sim2 = key2.cosine_similarity(&existing.key2);
            if sim1 > self.config.dedup_threshold && sim2 > self.config.dedup_threshold {
                debug!(sim1, sim2, "doctor record rejected as duplicate");
                return Ok(false);
            }
        }
        self.records.push(DoctorExchange {
            question1: question1.to_string(),
            key1,
            context1: context1.to_string(),
            answer1: answer1.to_string(),
            key2,
            question2: question2.to_string(),
            answer2: answer2.to_string(),
            context2: context2.to_string(),
        });
        Ok(true)
    }

    /// Returns the most related stored exchanges, matched on the first
    /// question key only.
    pub async fn lookup(&self, question: &str) -> Result<Vec<DoctorExchange>, StoreError> {
        let key = self.embedder.embed(question).await?;
        let scored = self
            .records
            .iter()
            .filter_map(|record| {
                let similarity = key.cosine_similarity(&record.key1);
                (similarity > self.config.lookup_threshold).then(|| (similarity, record.clone()))
            })
            .collect();
        Ok(select_exemplars(scored))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
