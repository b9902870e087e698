//! reqwest-backed control-plane client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

use thrash_config::ClientConfig;

use crate::client::{ApiClient, Scope, WatchStream};
use crate::credentials::Credentials;
use crate::errors::{ClientError, ClientResult};

/// HTTP client speaking the Kubernetes REST conventions for secrets:
/// GET list, chunked `?watch=true` event stream, POST create.
pub struct HttpApiClient {
    http: Client,
    server: String,
    token: Option<String>,
    /// Server-side timeout applied to list polls
    request_timeout: Duration,
}

impl HttpApiClient {
    /// Build a client from configuration, resolving credentials from the
    /// kubeconfig or the in-cluster service account
    pub fn connect(config: &ClientConfig, request_timeout: Duration) -> ClientResult<Self> {
        let creds = if config.use_in_cluster_config {
            Credentials::in_cluster()?
        } else {
            Credentials::from_kubeconfig(&config.kubeconfig_path(), config.context.as_deref())?
        };
        Self::with_credentials(creds, request_timeout)
    }

    /// Build a client from already-resolved credentials
    pub fn with_credentials(creds: Credentials, request_timeout: Duration) -> ClientResult<Self> {
        let mut builder = Client::builder()
            // No global timeout: watch connections stay open almost
            // indefinitely, server-side timeouts bound them instead.
            .danger_accept_invalid_certs(creds.accept_invalid_certs);

        if let Some(ref pem) = creds.ca_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| ClientError::Credentials(format!("bad cluster CA: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build().map_err(ClientError::from)?;

        Ok(Self {
            http,
            server: creds.server,
            token: creds.token,
            request_timeout,
        })
    }

    fn secrets_url(&self, scope: &Scope) -> String {
        match scope {
            Scope::Cluster => format!("{}/api/v1/secrets", self.server),
            Scope::Namespaced(ns) => format!("{}/api/v1/namespaces/{}/secrets", self.server, ns),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Map a non-success response into `ClientError::Api`
async fn check_status(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn list(&self, scope: &Scope) -> ClientResult<u64> {
        let timeout = self.request_timeout.as_secs().to_string();
        let resp = self
            .request(self.http.get(self.secrets_url(scope)))
            .query(&[("timeoutSeconds", timeout.as_str())])
            .send()
            .await?;
        let body: JsonValue = check_status(resp).await?.json().await?;
        let count = body
            .get("items")
            .and_then(|items| items.as_array())
            .map(|items| items.len() as u64)
            .unwrap_or(0);
        debug!(%scope, count, "list poll completed");
        Ok(count)
    }

    async fn watch(&self, scope: &Scope, timeout: Duration) -> ClientResult<WatchStream> {
        let secs = timeout.as_secs().to_string();
        let resp = self
            .request(self.http.get(self.secrets_url(scope)))
            .query(&[("watch", "true"), ("timeoutSeconds", secs.as_str())])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        debug!(%scope, "watch stream opened");
        Ok(WatchStream::new(
            resp.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)),
        ))
    }

    async fn create(&self, target: &str, payload: JsonValue) -> ClientResult<()> {
        let url = self.secrets_url(&Scope::Namespaced(target.to_string()));
        let resp = self.request(self.http.post(url)).json(&payload).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}
