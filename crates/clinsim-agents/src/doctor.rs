//! Doctor consultation tree.
//!
//! A consultation is led by a primary doctor who can recruit specialist
//! sub-doctors from other offices. The doctors form an arena tree: nodes
//! live in a flat `Vec` and refer to each other by index, so driving a
//! sub-doctor or folding its summary never walks an ownership cycle, and
//! referral depth is capped explicitly.
//!
//! Each turn the lead doctor first drives every in-budget sub-doctor
//! through one exchange with the patient, folds their summaries into its
//! own prompt, and only then asks for its next question.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use serde::Serialize;
use tracing::{debug, info};

use clinsim_evolve::{DoctorEvolveStore, DoctorStoreConfig};
use clinsim_protocols::{Assessor, Embedder, LanguageModel, TurnScores};

use crate::error::AgentError;
use crate::patient::PatientAgent;
use crate::prompts::PromptTemplates;
use crate::reply::{extract_span, split_offices, DoctorReply};

#[derive(Debug, Clone)]
pub struct DoctorTreeConfig {
    /// A node summarizes and clears its history every this many turns.
    pub summary_period: u32,
    /// Sub-doctors past this many turns are no longer driven, only their
    /// summaries are folded in.
    pub child_turn_budget: u32,
    /// Maximum referral depth; the root is at depth 1.
    pub max_depth: u32,
    /// Minimum composite score for an exchange pair to be written back.
    pub min_store_score: f32,
    pub store: DoctorStoreConfig,
}

impl Default for DoctorTreeConfig {
    fn default() -> Self {
        Self {
            summary_period: 3,
            child_turn_budget: 5,
            max_depth: 3,
            min_store_score: 3.0,
            store: DoctorStoreConfig::default(),
        }
    }
}

/// Index of a doctor node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One half of a question pair awaiting its successor before write-back.
#[derive(Debug, Clone)]
struct PendingExchange {
    question: String,
    answer: String,
    context: String,
}

/// Per-turn record kept for artifact output.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub question: String,
    pub category: String,
    pub answer: String,
    pub doctor_score: f32,
    pub patient_scores: TurnScores,
}

pub struct DoctorNode {
    pub office: String,
    pub main_complaint: String,
    pub dialog_history: String,
    pub summary: String,
    pub dialog_turn: u32,
    pub depth: u32,
    pub last_question: String,
    pub last_category: String,
    pub last_score: f32,
    pub records: Vec<TurnRecord>,
    pub children: Vec<NodeId>,
    pending: Option<PendingExchange>,
    queued_answer: String,
    queued_scores: TurnScores,
}

impl DoctorNode {
    fn new(office: String, main_complaint: String, depth: u32) -> Self {
        Self {
            office,
            main_complaint,
            dialog_history: String::new(),
            summary: String::new(),
            dialog_turn: 0,
            depth,
            last_question: String::new(),
            last_category: String::new(),
            last_score: 0.0,
            records: Vec::new(),
            children: Vec::new(),
            pending: None,
            queued_answer: String::new(),
            queued_scores: TurnScores::default(),
        }
    }
}

pub struct DoctorTree {
    nodes: Vec<DoctorNode>,
    oracle: Arc<dyn LanguageModel>,
    assessor: Arc<dyn Assessor>,
    embedder: Arc<dyn Embedder>,
    prompts: Arc<PromptTemplates>,
    stores: HashMap<String, DoctorEvolveStore>,
    offices_seen: HashSet<String>,
    config: DoctorTreeConfig,
}

impl DoctorTree {
    pub fn new(
        office: impl Into<String>,
        main_complaint: impl Into<String>,
        oracle: Arc<dyn LanguageModel>,
        assessor: Arc<dyn Assessor>,
        embedder: Arc<dyn Embedder>,
        prompts: Arc<PromptTemplates>,
        config: DoctorTreeConfig,
    ) -> Self {
        let office = office.into();
        let root = DoctorNode::new(office.clone(), main_complaint.into(), 1);
        let mut offices_seen = HashSet::new();
        offices_seen.insert(office);
        Self {
            nodes: vec![root],
            oracle,
            assessor,
            embedder,
            prompts,
            stores: HashMap::new(),
            offices_seen,
            config,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &DoctorNode {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn store(&self, office: &str) -> Option<&DoctorEvolveStore> {
        self.stores.get(office)
    }

    /// Offices match loosely: a trimmed, case-folded prefix either way
    /// counts as already staffed, so "心内科" blocks "心内科门诊".
    fn office_staffed(&self, office: &str) -> bool {
        let probe = office.trim().to_lowercase();
        self.offices_seen.iter().any(|seen| {
            let seen = seen.trim().to_lowercase();
            seen.starts_with(&probe) || probe.starts_with(&seen)
        })
    }

    fn store_for(&mut self, office: &str) -> &mut DoctorEvolveStore {
        let embedder = self.embedder.clone();
        let store_config = self.config.store;
        self.stores
            .entry(office.to_string())
            .or_insert_with(|| DoctorEvolveStore::new(embedder, store_config))
    }

    /// Advances the lead doctor by one turn given the patient's latest
    /// answer and its quality scores.
    pub async fn next_question(
        &mut self,
        patient: &mut PatientAgent,
        answer: String,
        scores: TurnScores,
    ) -> Result<DoctorReply, AgentError> {
        self.node_question(self.root(), patient, answer, scores)
            .await
    }

    fn node_question<'a>(
        &'a mut self,
        id: NodeId,
        patient: &'a mut PatientAgent,
        answer: String,
        scores: TurnScores,
    ) -> LocalBoxFuture<'a, Result<DoctorReply, AgentError>> {
        Box::pin(async move {
            let (office, complaint, summary, history, lookup_key) = {
                let node = &self.nodes[id.0];
                (
                    node.office.clone(),
                    node.main_complaint.clone(),
                    node.summary.clone(),
                    node.dialog_history.clone(),
                    node.pending
                        .as_ref()
                        .map(|p| p.question.clone())
                        .unwrap_or_else(|| node.last_question.clone()),
                )
            };

            let exemplars = self.store_for(&office).lookup(&lookup_key).await?;
            let example = if exemplars.is_empty() {
                "无示例。".to_string()
            } else {
                let mut out = String::new();
                for (idx, exemplar) in exemplars.iter().enumerate() {
                    out.push_str(&format!(
                        "例子{}:问题：{}病人回答：{}新问题{}",
                        idx + 1,
                        exemplar.question1,
                        exemplar.answer1,
                        exemplar.question2
                    ));
                }
                out
            };

            let mut prompt = self.prompts.render(
                "doctor_question_info",
                &[
                    ("office", office.as_str()),
                    ("complaint", complaint.as_str()),
                    ("summary", summary.as_str()),
                    ("history", history.as_str()),
                    ("example", example.as_str()),
                    ("information", patient.resource()),
                ],
            )?;

            // Drive each in-budget sub-doctor through one exchange, then
            // fold its summary in. A skipping sub-doctor contributes
            // nothing this turn.
            let children = self.nodes[id.0].children.clone();
            for child in children {
                if self.nodes[child.0].dialog_turn <= self.config.child_turn_budget {
                    let queued_answer = self.nodes[child.0].queued_answer.clone();
                    let queued_scores = self.nodes[child.0].queued_scores;
                    let reply = self
                        .node_question(child, &mut *patient, queued_answer, queued_scores)
                        .await?;
                    match reply {
                        DoctorReply::Question { text, .. } => {
                            let turn = patient.answer(&text).await?;
                            let node = &mut self.nodes[child.0];
                            node.queued_answer = turn.answer;
                            node.queued_scores = turn.scores;
                            self.summarize(child).await?;
                        }
                        DoctorReply::Skip | DoctorReply::Conclusion => continue,
                    }
                }
                let node = &self.nodes[child.0];
                prompt.push_str(&format!("*****{}*****", node.office));
                prompt.push_str(&node.summary);
            }

            let response = self.oracle.generate(&prompt).await?;
            let (question, category) = match DoctorReply::parse(&response) {
                DoctorReply::Question { text, category } => (text, category),
                other => return Ok(other),
            };

            self.nodes[id.0]
                .dialog_history
                .push_str(&format!("patient answer: {answer}\n"));

            // Grade the previous question against what it elicited.
            let last_question = self.nodes[id.0].last_question.clone();
            let mut score = 0.0;
            let mut grounding = String::new();
            if !last_question.is_empty() {
                grounding = patient.grounding(&last_question).await?;
                let graded = self
                    .assessor
                    .assess_doctor(&last_question, &grounding, &answer)
                    .await?;
                score = graded.composite;

                let last_category = self.nodes[id.0].last_category.clone();
                self.nodes[id.0].records.push(TurnRecord {
                    question: last_question.clone(),
                    category: last_category,
                    answer: answer.clone(),
                    doctor_score: score,
                    patient_scores: scores,
                });
            }

            // Write back the completed exchange pair only when both halves
            // were good turns.
            let (pending, last_score) = {
                let node = &self.nodes[id.0];
                (node.pending.clone(), node.last_score)
            };
            if score >= self.config.min_store_score && last_score >= 1.0 {
                if let Some(pending) = &pending {
                    if !pending.question.is_empty() {
                        let stored = self
                            .store_for(&office)
                            .try_store(
                                &pending.question,
                                &pending.context,
                                &pending.answer,
                                &last_question,
                                &answer,
                                &grounding,
                            )
                            .await?;
                        debug!(office = %office, stored, "doctor exchange write-back");
                    }
                }
            }

            {
                let node = &mut self.nodes[id.0];
                node.pending = Some(PendingExchange {
                    question: last_question,
                    answer: answer.clone(),
                    context: grounding,
                });
                node.last_score = score;
                node.last_question = question.clone();
                node.last_category = category.clone();
                node.dialog_history.push_str("--- dialog ---\n");
                node.dialog_history
                    .push_str(&format!("doctor question: {question}\n"));
                node.dialog_turn += 1;
            }
            if self.nodes[id.0].dialog_turn % self.config.summary_period == 0 {
                self.summarize(id).await?;
            }

            Ok(DoctorReply::Question {
                text: question,
                category,
            })
        })
    }

    /// Compresses a node's dialog history into its rolling summary.
    async fn summarize(&mut self, id: NodeId) -> Result<(), AgentError> {
        let (office, summary, history) = {
            let node = &self.nodes[id.0];
            (
                node.office.clone(),
                node.summary.clone(),
                node.dialog_history.clone(),
            )
        };
        let mut prompt = self.prompts.render(
            "summary",
            &[("office", office.as_str()), ("summary", summary.as_str())],
        )?;
        prompt.push_str(&history);
        let new_summary = self.oracle.generate(&prompt).await?;
        let node = &mut self.nodes[id.0];
        node.summary = new_summary;
        node.dialog_history.clear();
        Ok(())
    }

    /// Asks the lead doctor whether to refer, then recursively lets each
    /// recruited specialist refer further within the depth cap. Returns
    /// the offices recruited, in recruitment order.
    pub async fn recruit(&mut self, patient: &mut PatientAgent) -> Result<Vec<String>, AgentError> {
        self.recruit_node(self.root(), patient).await
    }

    fn recruit_node<'a>(
        &'a mut self,
        id: NodeId,
        patient: &'a mut PatientAgent,
    ) -> LocalBoxFuture<'a, Result<Vec<String>, AgentError>> {
        Box::pin(async move {
            let (office, complaint, summary, history, turn, depth) = {
                let node = &self.nodes[id.0];
                (
                    node.office.clone(),
                    node.main_complaint.clone(),
                    node.summary.clone(),
                    node.dialog_history.clone(),
                    node.dialog_turn,
                    node.depth,
                )
            };
            if depth >= self.config.max_depth {
                debug!(office = %office, depth, "depth cap reached, not recruiting");
                return Ok(Vec::new());
            }

            let prompt = self.prompts.render(
                "recruit",
                &[
                    ("office", office.as_str()),
                    ("complaint", complaint.as_str()),
                    ("summary", summary.as_str()),
                    ("history", history.as_str()),
                    ("turn", turn.to_string().as_str()),
                ],
            )?;
            let response = self.oracle.generate(&prompt).await?;
            let span = extract_span(&response, '#').unwrap_or_else(|| "NO".to_string());
            if span.contains("NO") {
                return Ok(Vec::new());
            }

            let mut recruited = Vec::new();
            for new_office in split_offices(&span) {
                if self.office_staffed(&new_office) {
                    debug!(office = %new_office, "office already staffed, not recruiting");
                    continue;
                }
                self.offices_seen.insert(new_office.clone());

                let child = NodeId(self.nodes.len());
                self.nodes
                    .push(DoctorNode::new(new_office.clone(), complaint.clone(), depth + 1));
                self.nodes[id.0].children.push(child);

                // First exchange so the specialist starts with context.
                let reply = self
                    .node_question(child, &mut *patient, complaint.clone(), TurnScores::default())
                    .await?;
                if let DoctorReply::Question { text, .. } = reply {
                    let turn = patient.answer(&text).await?;
                    let node = &mut self.nodes[child.0];
                    node.queued_answer = turn.answer;
                    node.queued_scores = turn.scores;
                }
                info!(office = %new_office, depth = depth + 1, "specialist recruited");
                recruited.push(new_office);

                let mut sub = self.recruit_node(child, &mut *patient).await?;
                recruited.append(&mut sub);
            }
            Ok(recruited)
        })
    }

    /// Final report from the lead doctor, folding in each direct
    /// specialist's summary.
    pub async fn conclusion(&self) -> Result<String, AgentError> {
        let root = &self.nodes[0];
        let mut prompt = self.prompts.render(
            "conclusion",
            &[
                ("office", root.office.as_str()),
                ("summary", root.summary.as_str()),
                ("history", root.dialog_history.as_str()),
            ],
        )?;
        for child in &root.children {
            let node = &self.nodes[child.0];
            prompt.push_str(&format!("*****{}*****", node.office));
            prompt.push_str(&node.summary);
        }
        Ok(self.oracle.generate(&prompt).await?)
    }

    /// The lead doctor's response to a mid-consultation emergency.
    pub async fn crisis_answer(
        &self,
        patient_crisis: &str,
        chat_log: &str,
        resource: &str,
    ) -> Result<String, AgentError> {
        let office = self.nodes[0].office.as_str();
        let prompt = self.prompts.render(
            "doctor_crisis_answer",
            &[
                ("office", office),
                ("chat", chat_log),
                ("crisis", patient_crisis),
                ("information", resource),
            ],
        )?;
        Ok(self.oracle.generate(&prompt).await?)
    }
}

#[cfg(test)]
#[path = "doctor_tests.rs"]
mod tests;
