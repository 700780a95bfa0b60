//! Retrieval errors.

use clinsim_protocols::OracleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The lexical and vector indexes disagree on corpus membership.
    /// A build-time invariant was violated; not recoverable.
    #[error("corpus mismatch: expected {expected} chunks, index covers {actual}")]
    CorpusMismatch { expected: usize, actual: usize },

    #[error("embedding oracle failed: {0}")]
    Oracle(#[from] OracleError),
}
