//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_simulation(config, &mut result);
        Self::validate_retrieval(config, &mut result);
        Self::validate_stores(config, &mut result);
        Self::validate_providers(config, &mut result);

        Ok(result)
    }

    fn validate_simulation(config: &Config, result: &mut ValidationResult) {
        if config.simulation.max_turns < 2 {
            result.add_error(ValidationError::new(
                "simulation.max_turns",
                "max_turns must be at least 2 so a crisis turn can be drawn",
            ));
        }

        if config.simulation.summary_period == 0 {
            result.add_error(ValidationError::new(
                "simulation.summary_period",
                "summary_period must be greater than 0",
            ));
        }

        if config.simulation.max_depth == 0 {
            result.add_error(ValidationError::new(
                "simulation.max_depth",
                "max_depth must be greater than 0",
            ));
        }

        if config.simulation.max_depth > 10 {
            result.add_warning(ValidationWarning::new(
                "simulation.max_depth",
                "max_depth is very high (>10), referral trees this deep are unusual",
            ));
        }
    }

    fn validate_retrieval(config: &Config, result: &mut ValidationResult) {
        if !(0.0..=1.0).contains(&config.retrieval.alpha) {
            result.add_error(ValidationError::new(
                "retrieval.alpha",
                "alpha must be within [0, 1]",
            ));
        }

        if config.retrieval.top_k == 0 {
            result.add_error(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if config.retrieval.chunk_overlap >= config.retrieval.chunk_size {
            result.add_error(ValidationError::new(
                "retrieval.chunk_overlap",
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
    }

    fn validate_stores(config: &Config, result: &mut ValidationResult) {
        let thresholds = [
            ("patient_store.dedup_threshold", config.patient_store.dedup_threshold),
            ("patient_store.lookup_threshold", config.patient_store.lookup_threshold),
            ("doctor_store.dedup_threshold", config.doctor_store.dedup_threshold),
            ("doctor_store.lookup_threshold", config.doctor_store.lookup_threshold),
        ];
        for (path, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                result.add_error(ValidationError::new(
                    path,
                    "cosine similarity thresholds must be within [0, 1]",
                ));
            }
        }

        if !(0.0..=1.0).contains(&config.vague.dropout) {
            result.add_error(ValidationError::new(
                "vague.dropout",
                "dropout must be within [0, 1]",
            ));
        }
    }

    fn validate_providers(config: &Config, result: &mut ValidationResult) {
        for (name, provider) in &config.providers {
            if provider.api_key.is_none() {
                result.add_warning(ValidationWarning::new(
                    format!("providers.{}.api_key", name),
                    "API key is not set, may need to be set via environment variable",
                ));
            }

            if let Some(ref url) = provider.base_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    result.add_error(ValidationError::new(
                        format!("providers.{}.base_url", name),
                        "base_url must start with http:// or https://",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
