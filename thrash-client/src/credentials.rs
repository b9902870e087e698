//! Credential loading: kubeconfig file or in-cluster service account

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::errors::{ClientError, ClientResult};

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Resolved connection credentials for the control plane
#[derive(Debug, Clone)]
pub struct Credentials {
    /// API server base URL, no trailing slash
    pub server: String,
    /// Bearer token, when present
    pub token: Option<String>,
    /// Skip TLS verification (kubeconfig `insecure-skip-tls-verify`, and
    /// always for in-cluster where we do not pin the cluster CA)
    pub accept_invalid_certs: bool,
    /// PEM-encoded cluster CA, when the kubeconfig carries one
    pub ca_pem: Option<Vec<u8>>,
}

impl Credentials {
    /// Load from a kubeconfig file, honoring `current-context` unless an
    /// explicit context name is given
    pub fn from_kubeconfig(path: &Path, context: Option<&str>) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Kubeconfig = serde_yaml::from_str(&content)
            .map_err(|e| ClientError::Credentials(format!("cannot parse kubeconfig: {}", e)))?;

        let context_name = context
            .map(str::to_string)
            .or(config.current_context.clone())
            .ok_or_else(|| ClientError::Credentials("no current-context in kubeconfig".into()))?;

        let context = config
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| {
                ClientError::Credentials(format!("context {} not found", context_name))
            })?;

        let cluster = config
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| {
                ClientError::Credentials(format!("cluster {} not found", context.cluster))
            })?;

        let token = config
            .users
            .iter()
            .find(|u| u.name == context.user)
            .and_then(|u| u.user.token.clone());

        let ca_pem = match cluster.certificate_authority_data.as_deref() {
            Some(data) => Some(decode_base64(data)?),
            None => None,
        };

        debug!(context = %context_name, server = %cluster.server, "loaded kubeconfig credentials");

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            token,
            accept_invalid_certs: cluster.insecure_skip_tls_verify,
            ca_pem,
        })
    }

    /// Load the in-cluster service-account credentials
    pub fn in_cluster() -> ClientResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ClientError::Credentials("KUBERNETES_SERVICE_HOST not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let token = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN)
            .map_err(|e| ClientError::Credentials(format!("cannot read service token: {}", e)))?;

        Ok(Self {
            server: format!("https://{}:{}", host, port),
            token: Some(token.trim().to_string()),
            accept_invalid_certs: true,
            ca_pem: None,
        })
    }
}

fn decode_base64(data: &str) -> ClientResult<Vec<u8>> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ClientError::Credentials(format!("bad certificate-authority-data: {}", e)))
}

// Minimal kubeconfig shape; unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct Kubeconfig {
    #[serde(rename = "current-context")]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
struct Cluster {
    server: String,
    #[serde(rename = "insecure-skip-tls-verify", default)]
    insecure_skip_tls_verify: bool,
    #[serde(rename = "certificate-authority-data")]
    certificate_authority_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: Context,
}

#[derive(Debug, Deserialize)]
struct Context {
    cluster: String,
    user: String,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: User,
}

#[derive(Debug, Deserialize, Default)]
struct User {
    token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: thrash
clusters:
- name: target
  cluster:
    server: https://api.example.test:6443/
    insecure-skip-tls-verify: true
contexts:
- name: thrash
  context:
    cluster: target
    user: loadgen
users:
- name: loadgen
  user:
    token: sekrit
"#;

    #[test]
    fn loads_current_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();

        let creds = Credentials::from_kubeconfig(file.path(), None).unwrap();
        assert_eq!(creds.server, "https://api.example.test:6443");
        assert_eq!(creds.token.as_deref(), Some("sekrit"));
        assert!(creds.accept_invalid_certs);
    }

    #[test]
    fn unknown_context_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();

        let err = Credentials::from_kubeconfig(file.path(), Some("nope")).unwrap_err();
        assert!(matches!(err, ClientError::Credentials(_)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err =
            Credentials::from_kubeconfig(Path::new("/definitely/not/here"), None).unwrap_err();
        assert!(matches!(err, ClientError::Credentials(_)));
    }
}
