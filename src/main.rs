//! ClinSim - Simulated clinical dialogue framework
//!
//! Main entry point for the ClinSim CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clinsim_agents::{DoctorTreeConfig, PatientAgentConfig, PromptTemplates};
use clinsim_config::{Config, ConfigLoader, ConfigValidator, ProviderConfig};
use clinsim_evolve::{DoctorStoreConfig, PatientStoreConfig};
use clinsim_protocols::{Assessor, Embedder, HashEmbedder, LanguageModel, NeutralAssessor, ScriptedModel};
use clinsim_provider_openai::{OpenAiChat, OpenAiConfig, OpenAiEmbedder};
use clinsim_retrieval::{ChunkerConfig, RetrieverConfig};
use clinsim_session::{
    FsArtifactSink, RetryConfig, RetryEmbedder, RetryModel, SessionConfig, SimulationSession,
};

/// ClinSim CLI.
#[derive(Parser)]
#[command(name = "clinsim")]
#[command(about = "Simulated clinical dialogue framework")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulated consultation over a case record
    Run {
        /// Path to the case record text file
        case: PathBuf,

        /// Path to a patient persona file
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Path to a prompt-template JSON file overriding the built-ins
        #[arg(long)]
        prompts: Option<PathBuf>,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Deterministic seed (overrides the configured one)
        #[arg(long)]
        seed: Option<u64>,

        /// Provider name from the configuration
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Use in-process stub oracles instead of a provider
        #[arg(long)]
        offline: bool,
    },

    /// Validate the configuration file
    Validate,
}

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("clinsim")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard must outlive the program to flush buffered log lines.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    if path.exists() {
        Ok(ConfigLoader::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?)
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

fn session_config(config: &Config) -> SessionConfig {
    let chunker = ChunkerConfig {
        size: config.retrieval.chunk_size,
        overlap: config.retrieval.chunk_overlap,
    };
    let retriever = RetrieverConfig {
        alpha: config.retrieval.alpha,
        top_k: config.retrieval.top_k,
        ..Default::default()
    };
    SessionConfig {
        max_turns: config.simulation.max_turns,
        crisis_seed: config.simulation.crisis_seed,
        vague_dropout: config.vague.dropout,
        patient: PatientAgentConfig {
            min_store_score: config.patient.min_store_score,
            requirement_attempts: config.patient.requirement_attempts,
            detect_vague: config.simulation.detect_vague,
            chunker,
            retriever,
            store: PatientStoreConfig {
                dedup_threshold: config.patient_store.dedup_threshold,
                lookup_threshold: config.patient_store.lookup_threshold,
            },
        },
        doctor: DoctorTreeConfig {
            summary_period: config.simulation.summary_period,
            max_depth: config.simulation.max_depth,
            store: DoctorStoreConfig {
                dedup_threshold: config.doctor_store.dedup_threshold,
                lookup_threshold: config.doctor_store.lookup_threshold,
            },
            ..Default::default()
        },
    }
}

fn retry_config(config: &Config) -> RetryConfig {
    RetryConfig {
        max_retries: config.retry.max_retries,
        base_delay: std::time::Duration::from_millis(config.retry.base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.retry.max_delay_ms),
        backoff_multiplier: config.retry.multiplier,
        ..Default::default()
    }
}

fn build_oracles(
    provider: &ProviderConfig,
    retry: RetryConfig,
) -> anyhow::Result<(Arc<dyn LanguageModel>, Arc<dyn Embedder>)> {
    let api_key = provider
        .api_key
        .clone()
        .context("provider has no api_key configured")?;
    let mut oai = OpenAiConfig::new(api_key);
    if let Some(base_url) = &provider.base_url {
        oai = oai.with_base_url(base_url);
    }
    if let Some(model) = &provider.chat_model {
        oai = oai.with_chat_model(model);
    }
    if let Some(model) = &provider.embedding_model {
        oai = oai.with_embedding_model(model);
    }

    let chat = OpenAiChat::new(oai.clone())?;
    let embedder = OpenAiEmbedder::new(oai)?;
    Ok((
        Arc::new(RetryModel::new(Arc::new(chat), retry.clone())),
        Arc::new(RetryEmbedder::new(Arc::new(embedder), retry)),
    ))
}

async fn run_simulation(
    config: Config,
    case: PathBuf,
    profile: Option<PathBuf>,
    prompts: Option<PathBuf>,
    output: Option<PathBuf>,
    seed: Option<u64>,
    provider: String,
    offline: bool,
) -> anyhow::Result<()> {
    let case_text = std::fs::read_to_string(&case)
        .with_context(|| format!("failed to read case record {}", case.display()))?;
    let profile_text = match &profile {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read profile {}", path.display()))?,
        ),
        None => None,
    };

    let templates = match &prompts {
        Some(path) => PromptTemplates::from_file(path)
            .with_context(|| format!("failed to load prompts from {}", path.display()))?,
        None => PromptTemplates::defaults(),
    };

    let (oracle, embedder): (Arc<dyn LanguageModel>, Arc<dyn Embedder>) = if offline {
        info!("offline mode, using stub oracles");
        (
            Arc::new(ScriptedModel::always("**好的**")),
            Arc::new(HashEmbedder::new(64)),
        )
    } else {
        let provider_config = config
            .providers
            .get(&provider)
            .with_context(|| format!("provider '{provider}' not found in configuration"))?;
        build_oracles(provider_config, retry_config(&config))?
    };
    let assessor: Arc<dyn Assessor> = Arc::new(NeutralAssessor::passing(3.0));

    let mut session_config = session_config(&config);
    if let Some(seed) = seed {
        session_config.crisis_seed = Some(seed);
    }

    let output_dir = output.unwrap_or_else(|| config.simulation.output_dir.clone());
    let case_name = case
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("case")
        .to_string();
    let sink = Arc::new(FsArtifactSink::new(output_dir.join(&case_name)));

    let session = SimulationSession::new(
        oracle,
        assessor,
        embedder,
        Arc::new(templates),
        session_config,
        sink,
    );
    let outcome = session.run(&case_text, profile_text.as_deref()).await?;

    info!(
        office = %outcome.office,
        turns = outcome.turns_taken,
        recruited = outcome.recruited.len(),
        "consultation finished"
    );
    println!("office: {}", outcome.office);
    println!("turns: {}", outcome.turns_taken);
    if !outcome.recruited.is_empty() {
        println!("recruited: {}", outcome.recruited.join(", "));
    }
    println!("conclusion:\n{}", outcome.conclusion);
    Ok(())
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    if !result.is_valid() {
        bail!("configuration is invalid ({} errors)", result.errors.len());
    }
    println!("configuration is valid");
    Ok(())
}

// Agent futures are not Send; the whole run stays on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            case,
            profile,
            prompts,
            output,
            seed,
            provider,
            offline,
        } => {
            run_simulation(
                config, case, profile, prompts, output, seed, provider, offline,
            )
            .await
        }
        Commands::Validate => validate_config(&config),
    }
}
