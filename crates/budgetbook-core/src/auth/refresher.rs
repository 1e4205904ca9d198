//! Exchange of a refresh token for a new access token.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Path of the token refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/api/token/refresh/";

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Token refresher panicked")]
    Panicked,
}

/// Tokens issued by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access: String,
    /// Present when the backend rotates refresh tokens.
    pub refresh: Option<String>,
}

/// Performs the refresh network call. Never touches stored credentials.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Clone)]
pub struct HttpTokenRefresher {
    client: Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
        debug!(url = %self.url, "Refreshing access token");

        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(&RefreshRequest { refresh: refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let data: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if data.access.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "response does not contain an access token".to_string(),
            ));
        }

        Ok(RefreshedTokens {
            access: data.access,
            refresh: data.refresh.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(serde_json::json!({"refresh": "r1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "a2"})))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = HttpTokenRefresher::new(Client::new(), &server.uri());
        let tokens = refresher.refresh("r1").await.unwrap();
        assert_eq!(tokens, RefreshedTokens { access: "a2".into(), refresh: None });
    }

    #[tokio::test]
    async fn test_refresh_with_rotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access": "a2", "refresh": "r2"})),
            )
            .mount(&server)
            .await;

        let refresher = HttpTokenRefresher::new(Client::new(), &format!("{}/", server.uri()));
        let tokens = refresher.refresh("r1").await.unwrap();
        assert_eq!(tokens.refresh.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Token is invalid or expired"
            })))
            .mount(&server)
            .await;

        let refresher = HttpTokenRefresher::new(Client::new(), &server.uri());
        let err = refresher.refresh("bad").await.unwrap_err();
        assert!(matches!(err, RefreshError::Rejected { status: 401 }));
    }

    #[tokio::test]
    async fn test_refresh_missing_access_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": ""})))
            .mount(&server)
            .await;

        let refresher = HttpTokenRefresher::new(Client::new(), &server.uri());
        assert!(matches!(
            refresher.refresh("r").await,
            Err(RefreshError::InvalidResponse(_))
        ));
    }
}
