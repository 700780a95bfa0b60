//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub patient: PatientConfig,

    #[serde(default)]
    pub patient_store: StoreThresholds,

    #[serde(default)]
    pub doctor_store: DoctorStoreThresholds,

    #[serde(default)]
    pub vague: VagueConfig,

    #[serde(default)]
    pub retry: RetryPolicyConfig,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Top-level simulation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum question/answer turns per consultation.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// A doctor summarizes its transcript every this many turns.
    #[serde(default = "default_summary_period")]
    pub summary_period: u32,

    /// Maximum referral depth of the doctor tree.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Whether patient answers pass through the vagueness rewriter.
    #[serde(default)]
    pub detect_vague: bool,

    /// Seed for the crisis turn draw. Unset means a time-based seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crisis_seed: Option<u64>,

    /// Directory simulation artifacts are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_max_turns() -> u32 {
    10
}

fn default_summary_period() -> u32 {
    3
}

fn default_max_depth() -> u32 {
    3
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            summary_period: default_summary_period(),
            max_depth: default_max_depth(),
            detect_vague: false,
            crisis_seed: None,
            output_dir: default_output_dir(),
        }
    }
}

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight of the vector score in the fused ranking.
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Number of chunks returned per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunk window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_alpha() -> f32 {
    0.5
}

fn default_top_k() -> usize {
    2
}

fn default_chunk_size() -> usize {
    120
}

fn default_chunk_overlap() -> usize {
    40
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Patient agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientConfig {
    /// Minimum composite score for an answer to be stored as experience.
    #[serde(default = "default_min_store_score")]
    pub min_store_score: f32,

    /// Attempts allowed when extracting answer requirements.
    #[serde(default = "default_requirement_attempts")]
    pub requirement_attempts: u32,
}

fn default_min_store_score() -> f32 {
    3.0
}

fn default_requirement_attempts() -> u32 {
    3
}

impl Default for PatientConfig {
    fn default() -> Self {
        Self {
            min_store_score: default_min_store_score(),
            requirement_attempts: default_requirement_attempts(),
        }
    }
}

/// Dedup and lookup thresholds for the patient experience store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreThresholds {
    #[serde(default = "default_patient_dedup")]
    pub dedup_threshold: f32,

    #[serde(default = "default_patient_lookup")]
    pub lookup_threshold: f32,
}

fn default_patient_dedup() -> f32 {
    0.95
}

fn default_patient_lookup() -> f32 {
    0.9
}

impl Default for StoreThresholds {
    fn default() -> Self {
        Self {
            dedup_threshold: default_patient_dedup(),
            lookup_threshold: default_patient_lookup(),
        }
    }
}

/// Dedup and lookup thresholds for the doctor experience store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorStoreThresholds {
    #[serde(default = "default_doctor_dedup")]
    pub dedup_threshold: f32,

    #[serde(default = "default_doctor_lookup")]
    pub lookup_threshold: f32,
}

fn default_doctor_dedup() -> f32 {
    0.8
}

fn default_doctor_lookup() -> f32 {
    0.25
}

impl Default for DoctorStoreThresholds {
    fn default() -> Self {
        Self {
            dedup_threshold: default_doctor_dedup(),
            lookup_threshold: default_doctor_lookup(),
        }
    }
}

/// Vagueness obfuscation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VagueConfig {
    /// Fraction of candidate segments dropped from the resource text.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
}

fn default_dropout() -> f32 {
    0.3
}

impl Default for VagueConfig {
    fn default() -> Self {
        Self {
            dropout: default_dropout(),
        }
    }
}

/// Retry policy for oracle calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}
