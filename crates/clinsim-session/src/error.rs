//! Session errors.

use thiserror::Error;

use clinsim_agents::AgentError;
use clinsim_protocols::OracleError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Artifact write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcript serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
