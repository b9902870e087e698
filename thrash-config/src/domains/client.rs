//! Control-plane client configuration

use crate::domains::Validatable;
use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the control-plane API client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path to a kubeconfig file; `None` falls back to `$KUBECONFIG`
    /// or `~/.kube/config`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Use the in-cluster service-account credentials instead of a
    /// kubeconfig file
    #[serde(default)]
    pub use_in_cluster_config: bool,

    /// Kubeconfig context override; `None` uses `current-context`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            use_in_cluster_config: false,
            context: None,
        }
    }
}

impl ClientConfig {
    /// Resolve the kubeconfig path: explicit config, then `$KUBECONFIG`,
    /// then `~/.kube/config`.
    pub fn kubeconfig_path(&self) -> PathBuf {
        if let Some(ref path) = self.kubeconfig {
            return path.clone();
        }
        if let Ok(env_path) = std::env::var("KUBECONFIG") {
            if !env_path.is_empty() {
                return PathBuf::from(env_path);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kube")
            .join("config")
    }
}

impl Validatable for ClientConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref path) = self.kubeconfig {
            if path.as_os_str().is_empty() {
                return Err(self.validation_error("kubeconfig path cannot be empty"));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "client"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = ClientConfig {
            kubeconfig: Some(PathBuf::from("/tmp/kc.yaml")),
            ..Default::default()
        };
        assert_eq!(config.kubeconfig_path(), PathBuf::from("/tmp/kc.yaml"));
    }

    #[test]
    fn empty_explicit_path_fails_validation() {
        let config = ClientConfig {
            kubeconfig: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
