//! Load-shaping configuration

use crate::domains::Validatable;
use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};

/// Configuration for ramp-up and request pacing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoadConfig {
    /// Per-process linear ramp delay in seconds; process `i` waits
    /// `ramp_time * i` before starting any tasks
    #[serde(default = "default_ramp_time")]
    pub ramp_time: u64,

    /// Upper bound in seconds for the per-task startup jitter
    #[serde(default = "default_jitter_max")]
    pub jitter_max: u64,

    /// Server-side timeout in seconds for watch streams and list polls.
    /// Kept long so each connection generates as much sustained load as
    /// possible.
    #[serde(default = "default_watch_timeout")]
    pub watch_timeout: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            ramp_time: default_ramp_time(),
            jitter_max: default_jitter_max(),
            watch_timeout: default_watch_timeout(),
        }
    }
}

impl Validatable for LoadConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.watch_timeout == 0 {
            return Err(self.validation_error("watch_timeout must be at least 1 second"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load"
    }
}

fn default_ramp_time() -> u64 {
    30
}

fn default_jitter_max() -> u64 {
    4
}

fn default_watch_timeout() -> u64 {
    86400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LoadConfig::default();
        assert_eq!(config.ramp_time, 30);
        assert_eq!(config.jitter_max, 4);
        assert_eq!(config.watch_timeout, 86400);
    }

    #[test]
    fn zero_watch_timeout_rejected() {
        let config = LoadConfig {
            watch_timeout: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
