//! The raw HTTP call underneath the session layer.
//!
//! An executor sends one request with whatever token it is handed and sorts
//! the result into success, authorization failure, or other error. It holds
//! no token state and never retries; that is the session manager's job.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, warn};

use super::{ApiError, ApiResponse, RequestSpec};

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Classified result of a single send.
#[derive(Debug)]
pub enum ExecOutcome {
    Success(ApiResponse),
    /// The backend rejected the credentials (HTTP 401).
    AuthFailure,
    Failed(ApiError),
}

#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn send(&self, spec: &RequestSpec, access_token: Option<&str>) -> ExecOutcome;
}

/// reqwest-backed executor.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build an executor sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn classify(response: reqwest::Response) -> ExecOutcome {
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ExecOutcome::Failed(ApiError::NetworkError(e)),
        };

        match status {
            200..=299 => ExecOutcome::Success(ApiResponse::new(status, body)),
            401 => ExecOutcome::AuthFailure,
            _ => ExecOutcome::Failed(ApiError::from_status(status, &body)),
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn send(&self, spec: &RequestSpec, access_token: Option<&str>) -> ExecOutcome {
        let url = self.url_for(&spec.path);
        debug!(method = %spec.method, url = %url, authenticated = access_token.is_some(), "Sending request");

        let mut request = self
            .client
            .request(spec.method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        if let Some(ref body) = spec.body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                let outcome = Self::classify(response).await;
                if let ExecOutcome::Failed(ref e) = outcome {
                    warn!(method = %spec.method, url = %url, error = %e, "Request failed");
                }
                outcome
            }
            Err(e) => {
                warn!(method = %spec.method, url = %url, error = %e, "Failed to send request");
                ExecOutcome::Failed(ApiError::NetworkError(e))
            }
        }
    }
}
