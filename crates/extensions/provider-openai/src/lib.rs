//! OpenAI-compatible oracle implementations for ClinSim.
//!
//! Works against the official API and any endpoint that speaks the same
//! wire format, selected through a base-URL override.

mod api;
mod provider;

pub use provider::{OpenAiChat, OpenAiConfig, OpenAiEmbedder};
