//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        let expanded = Self::expand_env_vars(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.clinsim`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.simulation.max_turns, 10);
    }

    #[test]
    fn test_load_basic_config() {
        let content = r#"
            [simulation]
            max_turns = 12
            output_dir = "/tmp/clinsim-out"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.simulation.max_turns, 12);
        assert_eq!(
            config.simulation.output_dir.to_str().unwrap(),
            "/tmp/clinsim-out"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[retrieval]").unwrap();
        writeln!(file, "top_k = 5").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/clinsim.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let content = "invalid = [unclosed";
        let result = ConfigLoader::load_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("CLINSIM_TEST_VAR", "test_value");
        }
        let content = "value = \"${CLINSIM_TEST_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
        unsafe {
            std::env::remove_var("CLINSIM_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_CLINSIM_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_path() {
        let expanded = ConfigLoader::expand_path("~/.clinsim");
        assert!(!expanded.starts_with('~'));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let path = "/usr/local/share/clinsim";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }

    #[test]
    fn test_load_with_providers() {
        let content = r#"
            [providers.openai]
            api_key = "sk-test"
            base_url = "https://api.openai.com/v1"
            chat_model = "gpt-4o-mini"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.providers.contains_key("openai"));
        let openai = &config.providers["openai"];
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));
    }
}
