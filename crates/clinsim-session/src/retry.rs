//! Oracle retry and error handling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use clinsim_protocols::{Embedder, Embedding, LanguageModel, OracleError};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            let jitter = rand_jitter(delay * 0.1);
            (delay + jitter) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }

    async fn backoff(&self, error: &OracleError, attempt: u32) {
        let delay = if let OracleError::RateLimited {
            retry_after_seconds,
        } = error
        {
            Duration::from_secs(*retry_after_seconds)
        } else {
            self.delay_for_attempt(attempt)
        };

        warn!(
            "Oracle error (attempt {}/{}): {}, retrying in {:?}",
            attempt + 1,
            self.max_retries + 1,
            error,
            delay
        );
        sleep(delay).await;
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * max * 2.0 - max
}

/// Check if an error is retryable.
pub fn is_retryable(error: &OracleError) -> bool {
    match error {
        OracleError::RateLimited { .. } => true,
        OracleError::Network(_) => true,
        OracleError::Timeout(_) => true,
        OracleError::ApiError { status, .. } => is_retryable_status(*status),
        _ => false,
    }
}

/// Check if HTTP status code is retryable.
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Language model wrapper with retry capability.
pub struct RetryModel {
    inner: Arc<dyn LanguageModel>,
    config: RetryConfig,
}

impl RetryModel {
    pub fn new(inner: Arc<dyn LanguageModel>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &Arc<dyn LanguageModel> {
        &self.inner
    }
}

#[async_trait]
impl LanguageModel for RetryModel {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        debug!(model = self.inner.id(), "generating with retry");
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !is_retryable(&e) || attempt == self.config.max_retries {
                        return Err(e);
                    }
                    self.config.backoff(&e, attempt).await;
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(OracleError::Network("retry loop exhausted".to_string())))
    }
}

/// Embedder wrapper with retry capability.
pub struct RetryEmbedder {
    inner: Arc<dyn Embedder>,
    config: RetryConfig,
}

impl RetryEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Embedder for RetryEmbedder {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, OracleError> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.inner.embed(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    if !is_retryable(&e) || attempt == self.config.max_retries {
                        return Err(e);
                    }
                    self.config.backoff(&e, attempt).await;
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(OracleError::Network("retry loop exhausted".to_string())))
    }
}
