//! Configuration loading and environment variable handling

use crate::domains::ThrashConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader with the default prefix
    pub fn new() -> Self {
        Self {
            prefix: "THRASH".to_string(),
        }
    }

    /// Create a new config loader with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ThrashConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ThrashConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ThrashConfig> {
        let mut config = ThrashConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain: file if given, else env
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ThrashConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ThrashConfig) -> ConfigResult<()> {
        self.apply_client_overrides(&mut config.client)?;
        self.apply_load_overrides(&mut config.load)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Client overrides. `KUBECONFIG` and `USE_IN_CLUSTER_CONFIG` are read
    /// unprefixed to match the conventional variable names.
    fn apply_client_overrides(
        &self,
        config: &mut crate::domains::client::ClientConfig,
    ) -> ConfigResult<()> {
        if let Ok(in_cluster) = std::env::var("USE_IN_CLUSTER_CONFIG") {
            config.use_in_cluster_config = parse_bool(&in_cluster).map_err(|e| {
                ConfigError::EnvError(format!("Invalid USE_IN_CLUSTER_CONFIG: {}", e))
            })?;
        }

        if config.kubeconfig.is_none() {
            if let Ok(path) = std::env::var("KUBECONFIG") {
                if !path.is_empty() {
                    config.kubeconfig = Some(path.into());
                }
            }
        }

        if let Ok(context) = self.get_env_var("CONTEXT") {
            config.context = Some(context);
        }

        Ok(())
    }

    /// Load-shaping overrides
    fn apply_load_overrides(
        &self,
        config: &mut crate::domains::load::LoadConfig,
    ) -> ConfigResult<()> {
        if let Ok(ramp) = self.get_env_var("RAMP_TIME") {
            config.ramp_time = ramp
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid RAMP_TIME: {}", e)))?;
        }

        if let Ok(jitter) = self.get_env_var("JITTER_MAX") {
            config.jitter_max = jitter
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid JITTER_MAX: {}", e)))?;
        }

        if let Ok(timeout) = self.get_env_var("WATCH_TIMEOUT") {
            config.watch_timeout = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid WATCH_TIMEOUT: {}", e)))?;
        }

        Ok(())
    }

    /// Logging overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(level) = self.get_env_var("LOG_LEVEL") {
            config.level = level
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", e)))?;
        }
        Ok(())
    }

    /// Read a prefixed environment variable
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

/// Parse the usual boolean spellings (`1`, `true`, `yes`, `on`, ...)
fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Ok(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Ok(false),
        other => Err(format!("not a boolean: {}", other)),
    }
}
