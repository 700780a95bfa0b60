//! Experience store errors.
//!
//! A rejected duplicate is not an error; `try_store` reports it as
//! `Ok(false)`.

use clinsim_protocols::OracleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("embedding oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("malformed record row: {0}")]
    Codec(String),
}
