//! Domain-specific configuration modules

pub mod client;
pub mod load;
pub mod logging;

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};

/// Trait for validatable configuration domains
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> crate::error::ConfigError {
        crate::error::ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Main thrash configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThrashConfig {
    /// Control-plane client configuration
    #[serde(default)]
    pub client: client::ClientConfig,

    /// Load-shaping configuration
    #[serde(default)]
    pub load: load::LoadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl ThrashConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.client.validate()?;
        self.load.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ThrashConfig::default();
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn config_roundtrips_through_yaml() {
        let config = ThrashConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ThrashConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(parsed.validate_all().is_ok());
        assert_eq!(parsed.load.ramp_time, config.load.ramp_time);
    }
}
