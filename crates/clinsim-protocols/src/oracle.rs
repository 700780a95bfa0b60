//! Oracle trait definitions.
//!
//! The simulation consumes two external oracles: a text-generation model
//! and an embedding model. Both are injected as trait objects so tests can
//! substitute deterministic doubles (see [`crate::stub`]). No streaming:
//! every call blocks its caller until the oracle returns.

use async_trait::async_trait;

use crate::embedding::Embedding;
use crate::error::OracleError;

/// Core trait for text-generation oracles.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model ID.
    fn id(&self) -> &str;

    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Core trait for embedding oracles.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the embedder ID.
    fn id(&self) -> &str;

    /// Embedding dimensionality for this deployment.
    fn dimension(&self) -> usize;

    /// Embed a piece of text.
    ///
    /// Implementations must tolerate empty input; the convention is to
    /// embed the literal string "None" instead.
    async fn embed(&self, text: &str) -> Result<Embedding, OracleError>;
}
