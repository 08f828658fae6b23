//! Vault service client implementation.
//!
//! Talks to the KV version 2 engine (`/v1/<mount>/data/<path>`) and the
//! unauthenticated health endpoint.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use toolbox_types::{Result, SecretPath, SecretRecord, SecretStore, ToolboxError};
use tracing::debug;
use url::Url;

const HEALTH_PATH: &str = "v1/sys/health?standbyok=true&sealedcode=299&uninitcode=299";

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault URL
    pub url: String,
    /// Vault token
    pub token: String,
    /// Vault namespace (Enterprise)
    pub namespace: Option<String>,
    /// Bound on each HTTP request
    pub request_timeout: Duration,
}

impl VaultConfig {
    /// Plain-HTTP configuration for a store reached through a local tunnel.
    pub fn for_tunnel(local_addr: SocketAddr, token: impl Into<String>) -> Self {
        Self {
            url: format!("http://{}", local_addr),
            token: token.into(),
            namespace: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Health as reported by `sys/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VaultHealth {
    /// Whether the store has been initialized
    pub initialized: bool,
    /// Whether the store is sealed
    pub sealed: bool,
}

impl VaultHealth {
    /// Initialized and unsealed.
    pub fn is_ready(&self) -> bool {
        self.initialized && !self.sealed
    }
}

/// Vault client for interacting with HashiCorp Vault.
#[derive(Clone)]
pub struct VaultClient {
    config: VaultConfig,
    client: Client,
    base_url: Url,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("url", &self.config.url)
            .finish()
    }
}

impl VaultClient {
    /// Create a new Vault client.
    pub fn new(config: VaultConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| ToolboxError::Vault(format!("Invalid vault URL: {}", e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ToolboxError::Vault(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    /// Base URL requests are sent to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn data_url(&self, path: &SecretPath) -> Result<Url> {
        self.base_url
            .join(&format!("v1/{}/data/{}", path.mount(), path.sub_path()))
            .map_err(|e| ToolboxError::Vault(format!("Invalid path {}: {}", path, e)))
    }

    /// Send an authenticated request.
    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let mut req = self
            .client
            .request(method, url)
            .header("X-Vault-Token", &self.config.token);

        if let Some(ns) = &self.config.namespace {
            req = req.header("X-Vault-Namespace", ns);
        }

        if let Some(body) = body {
            req = req.json(&body);
        }

        req.send()
            .await
            .map_err(|e| ToolboxError::Vault(format!("Request failed: {}", e)))
    }

    async fn failure(resp: Response) -> ToolboxError {
        let status = resp.status();
        let error_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ToolboxError::Vault(format!(
            "Vault request failed ({}): {}",
            status,
            error_text.trim()
        ))
    }

    /// Fetch `sys/health`.
    ///
    /// Sealed and uninitialized states are returned, not treated as
    /// transport errors.
    pub async fn health(&self) -> Result<VaultHealth> {
        let url = self
            .base_url
            .join(HEALTH_PATH)
            .map_err(|e| ToolboxError::Vault(format!("Invalid URL: {}", e)))?;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolboxError::Vault(format!("Health check failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Self::failure(resp).await);
        }

        resp.json()
            .await
            .map_err(|e| ToolboxError::Vault(format!("Failed to parse health response: {}", e)))
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read(&self, path: &SecretPath) -> Result<Option<SecretRecord>> {
        #[derive(Deserialize)]
        struct ReadResponse {
            data: Option<Version>,
        }

        #[derive(Deserialize)]
        struct Version {
            data: Option<HashMap<String, serde_json::Value>>,
        }

        let resp = self
            .request(Method::GET, self.data_url(path)?, None)
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%path, "secret not found");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::failure(resp).await);
        }

        let response: ReadResponse = resp
            .json()
            .await
            .map_err(|e| ToolboxError::Vault(format!("Failed to parse response: {}", e)))?;

        let Some(data) = response.data.and_then(|version| version.data) else {
            return Ok(None);
        };

        // Convert values to strings
        let record = data
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        Ok(Some(record))
    }

    async fn write(&self, path: &SecretPath, data: &SecretRecord) -> Result<()> {
        let body = serde_json::json!({ "data": data });

        let resp = self
            .request(Method::POST, self.data_url(path)?, Some(body))
            .await?;

        if !resp.status().is_success() {
            return Err(Self::failure(resp).await);
        }
        debug!(%path, fields = data.len(), "secret written");
        Ok(())
    }
}
