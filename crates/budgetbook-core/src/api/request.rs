//! Request descriptions and responses passed through the session layer.

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// How a request relates to the session's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Needs an access token; fails fast when logged out.
    #[default]
    Required,
    /// Sends the token when there is one, goes out bare otherwise.
    Optional,
    /// Never carries credentials and never triggers a refresh (login, registration).
    Public,
}

/// Everything needed to perform one API call, minus the credentials.
///
/// The session layer attaches the current access token at send time, so the
/// same spec can be re-sent after a refresh.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub auth: AuthMode,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: AuthMode::Required,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Allow the call to go out without a bearer token when no session exists.
    pub fn allow_anonymous(mut self) -> Self {
        self.auth = AuthMode::Optional;
        self
    }

    pub fn public(mut self) -> Self {
        self.auth = AuthMode::Public;
        self
    }
}

/// A successful (2xx) response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_builders() {
        let spec = RequestSpec::post("/api/categories/")
            .json(&serde_json::json!({"name": "Food"}))
            .unwrap();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.path, "/api/categories/");
        assert_eq!(spec.body.unwrap()["name"], "Food");
        assert_eq!(spec.auth, AuthMode::Required);

        assert_eq!(RequestSpec::get("/x").allow_anonymous().auth, AuthMode::Optional);
        assert_eq!(RequestSpec::get("/x").public().auth, AuthMode::Public);
    }

    #[test]
    fn test_response_json() {
        #[derive(Deserialize)]
        struct Item {
            id: i64,
        }
        let response = ApiResponse::new(200, r#"{"id": 7}"#);
        let item: Item = response.json().unwrap();
        assert_eq!(item.id, 7);

        let bad = ApiResponse::new(200, "not json");
        assert!(matches!(bad.json::<Item>(), Err(ApiError::InvalidResponse(_))));
    }
}
