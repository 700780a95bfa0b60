//! # ClinSim Agents
//!
//! Simulated patient and doctor agents:
//!
//! - **Patient**: answers doctor questions grounded in a case record,
//!   imitating a layperson and evolving a store of good answers.
//! - **Doctor tree**: a consultation led by a primary doctor who can
//!   refer to specialist sub-doctors, arranged as an arena tree.
//! - **Vagueness**: obfuscation of the case record so the patient only
//!   "knows" an imprecise version of their own history.

mod doctor;
mod error;
mod patient;
mod prompts;
mod reply;
mod rng;
mod vagueness;

pub use doctor::{DoctorNode, DoctorTree, DoctorTreeConfig, NodeId, TurnRecord};
pub use error::AgentError;
pub use patient::{PatientAgent, PatientAgentConfig, PatientTurn};
pub use prompts::PromptTemplates;
pub use reply::{extract_requirements, extract_span, split_offices, DoctorReply};
pub use rng::SeededRng;
pub use vagueness::{dropout_vague, obfuscate, split_by_punctuation};
