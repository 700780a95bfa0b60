//! Agent errors.

use thiserror::Error;

use clinsim_evolve::StoreError;
use clinsim_protocols::OracleError;
use clinsim_retrieval::RetrievalError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Experience store error: {0}")]
    Store(#[from] StoreError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Missing prompt template: {0}")]
    MissingPrompt(String),

    #[error("Prompt parse error: {0}")]
    PromptParse(#[from] serde_json::Error),
}
