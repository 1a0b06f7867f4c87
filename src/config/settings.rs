use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::context::{MAX_COMMITS_LIMIT, MAX_DIFF_CONTEXT};
use crate::git::executor::{DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT, ExecutorConfig};
use crate::security::sanitizer::DEFAULT_MAX_MESSAGE_CHARS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Contents of `~/.config/gitctx/config.toml`; every field is optional
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub context: ContextConfig,
    pub executor: ExecutorSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    pub max_commits: usize,
    pub diff_context: u32,
    pub sanitize_for_ai: bool,
    pub max_message_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_commits: 10,
            diff_context: 3,
            sanitize_for_ai: true,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorSettings {
    pub git_binary: PathBuf,
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecutorSettings {
    pub fn to_executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            git_binary: self.git_binary.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_output_bytes: self.max_output_bytes,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitctx"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an
    /// error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default_config());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_commits > MAX_COMMITS_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "max_commits must be at most {}",
                MAX_COMMITS_LIMIT
            )));
        }

        if self.context.diff_context > MAX_DIFF_CONTEXT {
            return Err(ConfigError::InvalidValue(format!(
                "diff_context must be at most {}",
                MAX_DIFF_CONTEXT
            )));
        }

        if self.context.max_message_chars == 0 {
            return Err(ConfigError::InvalidValue(
                "max_message_chars must be greater than 0".to_string(),
            ));
        }

        if self.executor.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("timeout_ms must be greater than 0".to_string()));
        }

        if self.executor.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "max_output_bytes must be greater than 0".to_string(),
            ));
        }

        if self.executor.git_binary.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("git_binary must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.context.max_commits, 10);
        assert_eq!(config.context.diff_context, 3);
        assert!(config.context.sanitize_for_ai);
        assert_eq!(config.executor.timeout_ms, 10_000);
        assert_eq!(config.executor.max_output_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse("[context]\nmax_commits = 25\n").unwrap();
        assert_eq!(config.context.max_commits, 25);
        assert_eq!(config.context.diff_context, 3);
        assert_eq!(config.executor, ExecutorSettings::default());

        assert_eq!(Config::parse("").unwrap(), Config::default_config());
    }

    #[test]
    fn test_validate_limits() {
        let mut config = Config::default_config();
        config.context.max_commits = MAX_COMMITS_LIMIT + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.context.diff_context = MAX_DIFF_CONTEXT + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.executor.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Config::parse("[context]\nmax_commits = \"many\"\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[executor]\ntimeout_ms = 2500\ngit_binary = \"/usr/bin/git\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        let executor = config.executor.to_executor_config();
        assert_eq!(executor.timeout, Duration::from_millis(2500));
        assert_eq!(executor.git_binary, PathBuf::from("/usr/bin/git"));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default_config();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(config, parsed);
    }
}
