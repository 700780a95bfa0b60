//! # ClinSim Protocols
//!
//! Core protocol definitions (traits) for the ClinSim framework.
//! Contains the oracle interfaces every other crate is built against.
//!
//! ## Core Traits
//!
//! - [`LanguageModel`] - Trait for text-generation oracles
//! - [`Embedder`] - Trait for embedding oracles
//! - [`Assessor`] - Trait for the external answer-quality collaborator
//!
//! Deterministic in-process implementations for testing live in [`stub`].

pub mod assess;
pub mod embedding;
pub mod error;
pub mod oracle;
pub mod stub;

pub use assess::{Assessor, TurnScores};
pub use embedding::Embedding;
pub use error::OracleError;
pub use oracle::{Embedder, LanguageModel};
pub use stub::{HashEmbedder, NeutralAssessor, ScriptedModel};
