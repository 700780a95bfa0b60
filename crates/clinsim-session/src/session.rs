//! End-to-end consultation run.
//!
//! Wires the patient and the doctor tree together: degrades the case
//! record into the patient's vague self-knowledge, opens the consultation,
//! recruits specialists, injects one crisis mid-run and drives turns until
//! the lead doctor concludes or the turn budget runs out.

use std::sync::Arc;

use tracing::{info, warn};

use clinsim_agents::{
    obfuscate, DoctorReply, DoctorTree, DoctorTreeConfig, NodeId, PatientAgent, PatientAgentConfig,
    PromptTemplates, SeededRng,
};
use clinsim_protocols::{Assessor, Embedder, LanguageModel, TurnScores};

use crate::artifacts::ArtifactSink;
use crate::error::SessionError;
use crate::transcript::{CrisisReport, Transcript};

/// Session-level configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on doctor turns after the opening exchange.
    pub max_turns: u32,
    /// Seed for crisis-turn selection and record degradation. `None`
    /// seeds from the clock.
    pub crisis_seed: Option<u64>,
    /// Fraction of case-record tokens degraded before obfuscation.
    pub vague_dropout: f32,
    pub patient: PatientAgentConfig,
    pub doctor: DoctorTreeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            crisis_seed: None,
            vague_dropout: 0.3,
            patient: PatientAgentConfig::default(),
            doctor: DoctorTreeConfig::default(),
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Office the triage oracle assigned.
    pub office: String,
    /// The patient's opening complaint.
    pub main_complaint: String,
    pub transcript: Transcript,
    pub conclusion: String,
    /// Specialist offices recruited after the opening exchange.
    pub recruited: Vec<String>,
    /// Doctor turns actually consumed, opening exchange included.
    pub turns_taken: u32,
}

/// Drives one full doctor/patient consultation.
pub struct SimulationSession {
    oracle: Arc<dyn LanguageModel>,
    assessor: Arc<dyn Assessor>,
    embedder: Arc<dyn Embedder>,
    prompts: Arc<PromptTemplates>,
    config: SessionConfig,
    sink: Arc<dyn ArtifactSink>,
}

impl SimulationSession {
    pub fn new(
        oracle: Arc<dyn LanguageModel>,
        assessor: Arc<dyn Assessor>,
        embedder: Arc<dyn Embedder>,
        prompts: Arc<PromptTemplates>,
        config: SessionConfig,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            oracle,
            assessor,
            embedder,
            prompts,
            config,
            sink,
        }
    }

    /// Runs one consultation over a case record. `profile` conditions the
    /// patient's persona when present.
    pub async fn run(
        &self,
        case_text: &str,
        profile: Option<&str>,
    ) -> Result<SessionOutcome, SessionError> {
        let mut rng = match self.config.crisis_seed {
            Some(seed) => SeededRng::new(seed),
            None => SeededRng::from_time(),
        };

        let vague_info = obfuscate(
            case_text,
            self.oracle.as_ref(),
            &self.prompts,
            &mut rng,
            self.config.vague_dropout,
        )
        .await?;
        self.sink.write("resource.txt", case_text)?;
        self.sink.write("vague.txt", &vague_info)?;

        let mut patient = PatientAgent::new(
            self.oracle.clone(),
            self.assessor.clone(),
            self.embedder.clone(),
            self.prompts.clone(),
            case_text,
            &vague_info,
            self.config.patient.clone(),
        )
        .await?;
        if let Some(profile) = profile {
            patient.set_profile(profile);
        }

        let office = patient.assign_office().await?;
        let main_complaint = patient.main_complaint().await?;
        info!(office = %office, "consultation opened");

        let mut tree = DoctorTree::new(
            office.clone(),
            main_complaint.clone(),
            self.oracle.clone(),
            self.assessor.clone(),
            self.embedder.clone(),
            self.prompts.clone(),
            self.config.doctor.clone(),
        );

        let mut transcript = Transcript::new();
        let mut turns_taken: u32 = 0;

        // Opening exchange, seeded with the main complaint instead of a
        // previous patient answer.
        let opening = tree
            .next_question(&mut patient, main_complaint.clone(), TurnScores::default())
            .await?;
        let (mut answer, mut scores) = match opening {
            DoctorReply::Question { text, .. } => {
                let turn = patient.answer(&text).await?;
                transcript.push(0, text, turn.answer.clone(), turn.scores);
                turns_taken += 1;
                (turn.answer, turn.scores)
            }
            DoctorReply::Skip => (main_complaint.clone(), TurnScores::default()),
            DoctorReply::Conclusion => {
                return self
                    .finish(&tree, office, main_complaint, transcript, Vec::new(), 0)
                    .await;
            }
        };

        let recruited = tree.recruit(&mut patient).await?;

        let crisis_turn = rng.gen_range(
            u64::from(self.config.max_turns / 2),
            u64::from(self.config.max_turns),
        ) as u32;

        for turn in 1..=self.config.max_turns {
            if turn == crisis_turn && transcript.crisis.is_none() {
                let crisis = patient.crisis_begin().await?;
                let doctor_answer = tree
                    .crisis_answer(&crisis, patient.dialog_log(), patient.resource())
                    .await?;
                let patient_reaction = patient.crisis_reaction(&doctor_answer).await?;
                self.sink.write(
                    "crisis.txt",
                    &format!("{crisis}\n{doctor_answer}\n{patient_reaction}\n"),
                )?;
                transcript.crisis = Some(CrisisReport {
                    turn,
                    crisis,
                    doctor_answer,
                    patient_reaction,
                });
                info!(turn, "crisis injected");
            }

            match tree.next_question(&mut patient, answer.clone(), scores).await? {
                DoctorReply::Question { text, .. } => {
                    let turn_result = patient.answer(&text).await?;
                    transcript.push(turn, text, turn_result.answer.clone(), turn_result.scores);
                    turns_taken += 1;
                    answer = turn_result.answer;
                    scores = turn_result.scores;
                }
                DoctorReply::Skip => continue,
                DoctorReply::Conclusion => {
                    info!(turn, "doctor concluded");
                    break;
                }
            }
        }

        self.finish(&tree, office, main_complaint, transcript, recruited, turns_taken)
            .await
    }

    async fn finish(
        &self,
        tree: &DoctorTree,
        office: String,
        main_complaint: String,
        mut transcript: Transcript,
        recruited: Vec<String>,
        turns_taken: u32,
    ) -> Result<SessionOutcome, SessionError> {
        let mut conclusion = tree.conclusion().await?;
        if conclusion.trim().is_empty() {
            warn!("oracle returned an empty conclusion");
            conclusion = "未能生成结论。".to_string();
        }
        transcript.conclusion = Some(conclusion.clone());

        self.sink.write("transcript.json", &transcript.to_json()?)?;
        self.sink.write("conclusion.txt", &conclusion)?;
        for idx in 0..tree.node_count() {
            let node = tree.node(NodeId(idx));
            if node.records.is_empty() {
                continue;
            }
            let json = serde_json::to_string_pretty(&node.records)?;
            self.sink
                .write(&format!("records/{}.json", node.office), &json)?;
        }

        Ok(SessionOutcome {
            office,
            main_complaint,
            transcript,
            conclusion,
            recruited,
            turns_taken,
        })
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
