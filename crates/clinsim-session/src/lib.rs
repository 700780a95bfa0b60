//! # ClinSim Session
//!
//! Orchestration of a full simulated consultation: case obfuscation,
//! office assignment, the question/answer loop with a mid-consultation
//! crisis, and artifact output. Also provides bounded retry wrappers
//! around the oracle traits.

mod artifacts;
mod error;
mod retry;
mod session;
mod transcript;

pub use artifacts::{ArtifactSink, FsArtifactSink, NullSink};
pub use error::SessionError;
pub use retry::{is_retryable, RetryConfig, RetryEmbedder, RetryModel};
pub use session::{SessionConfig, SessionOutcome, SimulationSession};
pub use transcript::{CrisisReport, Transcript, TranscriptEntry};
