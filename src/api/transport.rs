//! HTTP transport for the provisioning API.
//!
//! The provider speaks JSON-over-HTTPS and authenticates every request via
//! `client_id`/`api_key` query parameters, on GET and POST alike. Exactly
//! one round trip is performed per call; every failure is surfaced
//! immediately with no retries.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ApiError;

/// Default API host.
pub const API_BASE_URL: &str = "https://api.digitalocean.com";

/// Request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request.
const USER_AGENT: &str = "coracle/client";

/// Request parameters, ordered for deterministic URLs.
pub type Params = BTreeMap<String, String>;

/// HTTP methods the provider accepts.
///
/// The v1 API only ever takes GET and POST; anything else would be a
/// programming error, so the restriction lives in the type rather than in a
/// runtime check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read-only request.
    Get,
    /// Mutating request.
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// API credentials injected into every outgoing parameter set.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account client id.
    pub client_id: String,
    /// Account API key.
    pub api_key: String,
}

/// Abstraction over one API round trip.
///
/// The real [`HttpTransport`] and the offline
/// [`MockTransport`](super::mock::MockTransport) are interchangeable behind
/// this trait; the shaper's contract is identical for both.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request and returns the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] variant per the provider's failure taxonomy.
    async fn request(&self, path: &str, method: Method, params: &Params)
    -> Result<Value, ApiError>;
}

/// reqwest-backed transport against the live API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// Creates a transport against the default API host.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            credentials,
        })
    }

    /// Overrides the API host, used by tests against a local server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the full query set: caller parameters plus credentials.
    fn query(&self, params: &Params) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        query.push((
            String::from("client_id"),
            self.credentials.client_id.clone(),
        ));
        query.push((String::from("api_key"), self.credentials.api_key.clone()));
        query
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        path: &str,
        method: Method,
        params: &Params,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let query = self.query(params);

        debug!("{method} {path}");
        trace!("query parameters: {params:?}");

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self
                .client
                .post(&url)
                .header(header::CONTENT_TYPE, "application/json"),
        };

        let response = builder
            .query(&query)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        match status.as_u16() {
            200 => {
                let body = response.text().await.unwrap_or_default();
                let payload: Value =
                    serde_json::from_str(&body).map_err(|_| ApiError::EmptyResponse {
                        path: path.to_string(),
                    })?;

                if let Some(message) = payload.get("error_message").and_then(Value::as_str) {
                    return Err(ApiError::Provider {
                        message: message.to_string(),
                    });
                }
                Ok(payload)
            }
            401 => Err(ApiError::AccessDenied),
            404 => Err(ApiError::NotFound {
                path: path.to_string(),
            }),
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status { status: code, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(Credentials {
            client_id: String::from("cid"),
            api_key: String::from("secret"),
        })
        .unwrap()
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn decodes_a_successful_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/droplets"))
            .and(query_param("client_id", "cid"))
            .and(query_param("api_key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "OK", "droplets": []})),
            )
            .mount(&server)
            .await;

        let payload = transport(&server)
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap();
        assert_eq!(payload["status"], "OK");
    }

    #[tokio::test]
    async fn status_401_is_access_denied_regardless_of_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        for p in ["/droplets", "/images", "/regions"] {
            let err = transport(&server)
                .request(p, Method::Get, &Params::new())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::AccessDenied));
        }
    }

    #[tokio::test]
    async fn status_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = transport(&server)
            .request("/droplets/999", Method::Get, &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let err = transport(&server)
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn provider_error_message_passes_through_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error_message": "No droplets for you"})),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap_err();
        match err {
            ApiError::Provider { message } => assert_eq!(message, "No droplets for you"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_statuses_carry_code_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_sends_parameters_in_the_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/droplets/1/rename"))
            .and(query_param("name", "newname"))
            .and(query_param("api_key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": 5})))
            .mount(&server)
            .await;

        let mut params = Params::new();
        params.insert(String::from("name"), String::from("newname"));
        let payload = transport(&server)
            .request("/droplets/1/rename", Method::Post, &params)
            .await
            .unwrap();
        assert_eq!(payload["event_id"], 5);
    }
}
