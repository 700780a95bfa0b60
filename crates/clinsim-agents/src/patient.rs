//! Simulated patient.
//!
//! The patient answers doctor questions from retrieved slices of the
//! case record, imitating a layperson without medical vocabulary. Good
//! answers are distilled into requirements and stored as exemplars that
//! condition later answers to similar questions.

use std::sync::Arc;

use tracing::{debug, info};

use clinsim_evolve::{PatientEvolveStore, PatientStoreConfig};
use clinsim_protocols::{Assessor, Embedder, LanguageModel, TurnScores};
use clinsim_retrieval::{ChunkerConfig, HybridRetriever, RetrieverConfig};

use crate::error::AgentError;
use crate::prompts::PromptTemplates;
use crate::reply::{extract_requirements, extract_span};

/// Canned reply for questions too vague to answer from the record.
const VAGUE_QUESTION_REPLY: &str = "医生，这个问题太空泛了，要不就是我有点不太明白，\
    问一些具体的吧，而且我也听不懂医学名词，要我去做检查倒是可以。";

#[derive(Debug, Clone)]
pub struct PatientAgentConfig {
    /// Minimum composite score for an answer to become an exemplar.
    pub min_store_score: f32,
    /// Attempts allowed when extracting answer requirements.
    pub requirement_attempts: u32,
    /// Whether overly general questions are deflected instead of answered.
    pub detect_vague: bool,
    pub chunker: ChunkerConfig,
    pub retriever: RetrieverConfig,
    pub store: PatientStoreConfig,
}

impl Default for PatientAgentConfig {
    fn default() -> Self {
        Self {
            min_store_score: 3.0,
            requirement_attempts: 3,
            detect_vague: false,
            chunker: ChunkerConfig::default(),
            retriever: RetrieverConfig::default(),
            store: PatientStoreConfig::default(),
        }
    }
}

/// One patient answer with its quality scores.
#[derive(Debug, Clone)]
pub struct PatientTurn {
    pub answer: String,
    pub scores: TurnScores,
}

pub struct PatientAgent {
    oracle: Arc<dyn LanguageModel>,
    assessor: Arc<dyn Assessor>,
    prompts: Arc<PromptTemplates>,
    retriever: HybridRetriever,
    store: PatientEvolveStore,
    profile: String,
    resource: String,
    vague_info: String,
    crisis: String,
    dialog_log: String,
    config: PatientAgentConfig,
}

impl PatientAgent {
    /// Builds the patient over a full case record and its vague rendition.
    /// The retrieval index is built once, over the full record.
    pub async fn new(
        oracle: Arc<dyn LanguageModel>,
        assessor: Arc<dyn Assessor>,
        embedder: Arc<dyn Embedder>,
        prompts: Arc<PromptTemplates>,
        resource: &str,
        vague_info: &str,
        config: PatientAgentConfig,
    ) -> Result<Self, AgentError> {
        let retriever = HybridRetriever::build(
            resource,
            embedder.clone(),
            &config.chunker,
            config.retriever.clone(),
        )
        .await?;
        let store = PatientEvolveStore::new(embedder, config.store);
        Ok(Self {
            oracle,
            assessor,
            prompts,
            retriever,
            store,
            profile: String::new(),
            resource: resource.to_string(),
            vague_info: vague_info.to_string(),
            crisis: String::new(),
            dialog_log: String::new(),
            config,
        })
    }

    pub fn set_profile(&mut self, profile: impl Into<String>) {
        self.profile = profile.into();
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Full dialog so far, as appended line by line after each answer.
    pub fn dialog_log(&self) -> &str {
        &self.dialog_log
    }

    pub fn store(&self) -> &PatientEvolveStore {
        &self.store
    }

    /// Retrieved grounding context for a doctor question.
    pub async fn grounding(&self, question: &str) -> Result<String, AgentError> {
        Ok(self.retriever.grounding(question).await?)
    }

    /// Asks the triage oracle which office the patient should visit.
    pub async fn assign_office(&self) -> Result<String, AgentError> {
        let prompt = self
            .prompts
            .render("assign_doctor_office", &[("information", &self.vague_info)])?;
        let response = self.oracle.generate(&prompt).await?;
        let office = extract_span(&response, '*').unwrap_or_else(|| response.trim().to_string());
        info!(office, "office assigned");
        Ok(office)
    }

    /// Generates the opening main complaint from the vague self-knowledge.
    pub async fn main_complaint(&self) -> Result<String, AgentError> {
        let prompt = self.prompts.render(
            "patient_question_generator",
            &[
                ("profile", self.profile.as_str()),
                ("information", self.vague_info.as_str()),
            ],
        )?;
        let response = self.oracle.generate(&prompt).await?;
        Ok(extract_span(&response, '*').unwrap_or_else(|| response.trim().to_string()))
    }

    /// Answers one doctor question.
    pub async fn answer(&mut self, question: &str) -> Result<PatientTurn, AgentError> {
        if self.config.detect_vague && !self.question_is_specific(question).await? {
            let turn = PatientTurn {
                answer: VAGUE_QUESTION_REPLY.to_string(),
                scores: TurnScores::default(),
            };
            self.log_turn(question, &turn.answer);
            return Ok(turn);
        }

        let grounding = self.retriever.grounding(question).await?;
        let exemplars = self.store.lookup(question).await?;

        let mut requirements = String::new();
        let example = if exemplars.is_empty() {
            "无示例。".to_string()
        } else {
            let mut lines = String::new();
            for (idx, exemplar) in exemplars.iter().enumerate() {
                lines.push_str(&format!(
                    "{}\n问题：{}\n病情信息：{}\n病人回答：{}\n",
                    idx + 1,
                    exemplar.question,
                    exemplar.context,
                    exemplar.answer
                ));
                if !exemplar.requirements.is_empty() {
                    requirements = exemplar.requirements.clone();
                }
            }
            lines
        };

        let prompt = if requirements.is_empty() {
            self.prompts.render(
                "patient_answer_generator",
                &[
                    ("profile", self.profile.as_str()),
                    ("question", question),
                    ("information", grounding.as_str()),
                    ("example", example.as_str()),
                ],
            )?
        } else {
            // Exemplar requirements replace the stock instructions.
            format!(
                "你是一个能够模仿一个没有专业医学知识病人口吻进行回答的回答生成器，\n\
                 这个病人的角色扮演要求：{}\n---------\n\
                 现在有一位医生向你提问，请你依据以下要求回答：{}\n\
                 问题为：{}。\n病情信息为：{}。\n例子：{}",
                self.profile, requirements, question, grounding, example
            )
        };

        let answer = self.oracle.generate(&prompt).await?;
        let scores = self
            .assessor
            .assess_patient(question, &grounding, &answer, &self.profile)
            .await?;

        if scores.composite >= self.config.min_store_score {
            self.distill_and_store(question, &grounding, &answer).await?;
        }

        self.log_turn(question, &answer);
        Ok(PatientTurn { answer, scores })
    }

    /// Extracts answer requirements for a good answer and stores the
    /// exchange as an exemplar. The extraction is retried a bounded
    /// number of times because the oracle does not always produce the
    /// requested span.
    async fn distill_and_store(
        &mut self,
        question: &str,
        grounding: &str,
        answer: &str,
    ) -> Result<(), AgentError> {
        let prompt = self
            .prompts
            .render("dynamic_requirements", &[("question", question)])?;
        for attempt in 0..self.config.requirement_attempts {
            let raw = self.oracle.generate(&prompt).await?;
            if let Some(requirements) = extract_requirements(&raw) {
                let stored = self
                    .store
                    .try_store(question, grounding, answer, &requirements)
                    .await?;
                debug!(attempt, stored, "patient exemplar distilled");
                return Ok(());
            }
        }
        debug!("requirements extraction failed, exemplar not stored");
        Ok(())
    }

    async fn question_is_specific(&self, question: &str) -> Result<bool, AgentError> {
        let prompt = self
            .prompts
            .render("question_general_detect", &[("question", question)])?;
        let response = self.oracle.generate(&prompt).await?;
        Ok(response.contains('是') || response.to_lowercase().contains("yes"))
    }

    fn log_turn(&mut self, question: &str, answer: &str) {
        self.dialog_log.push_str("--- dialog ---\n");
        self.dialog_log
            .push_str(&format!("doctor question: {question}\n"));
        self.dialog_log
            .push_str(&format!("patient answer: {answer}\n"));
    }

    /// Invents a mid-consultation emergency from the full record.
    pub async fn crisis_begin(&mut self) -> Result<String, AgentError> {
        let prompt = self
            .prompts
            .render("patient_crisis_generator", &[("information", &self.resource)])?;
        let crisis = self.oracle.generate(&prompt).await?;
        self.crisis = crisis.clone();
        Ok(crisis)
    }

    /// The patient's reaction to the doctor's emergency response.
    pub async fn crisis_reaction(&self, doctor_answer: &str) -> Result<String, AgentError> {
        let prompt = self.prompts.render(
            "patient_crisis_answer",
            &[
                ("profile", self.profile.as_str()),
                ("information", self.resource.as_str()),
                ("crisis", self.crisis.as_str()),
                ("doctor_answer", doctor_answer),
            ],
        )?;
        Ok(self.oracle.generate(&prompt).await?)
    }
}

#[cfg(test)]
#[path = "patient_tests.rs"]
mod tests;
