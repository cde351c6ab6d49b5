//! The rendering client: the single choke point between resource accessors
//! and the transport.

use std::sync::Arc;

use tracing::trace;

use crate::error::{ApiError, RenderError};

use super::mock::MockTransport;
use super::record::Shaped;
use super::transport::{Credentials, HttpTransport, Method, Params, Transport};

/// Client that issues requests through a [`Transport`] and normalizes the
/// responses into [`Shaped`] values.
///
/// Every resource accessor talks to the provider exclusively through
/// [`ApiClient::render`]; the transport is never used directly.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Creates a client against the live API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn over_http(credentials: Credentials) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new(credentials)?)))
    }

    /// Creates a client backed by the canned offline responder.
    #[must_use]
    pub fn mocked() -> Self {
        Self::new(Arc::new(MockTransport::new()))
    }

    /// Issues a request and normalizes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns a transport error for HTTP-level failures and a shaping
    /// error when the payload does not hold `key` or holds an unexpected
    /// value under it.
    pub async fn render(
        &self,
        key: &str,
        path: &str,
        method: Method,
        params: &Params,
    ) -> Result<Shaped, RenderError> {
        let payload = self.transport.request(path, method, params).await?;
        trace!("shaping '{key}' from {path}");
        Ok(Shaped::from_payload(key, &payload)?)
    }

    /// Shorthand for a parameterless GET.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ApiClient::render`].
    pub async fn get(&self, key: &str, path: &str) -> Result<Shaped, RenderError> {
        self.render(key, path, Method::Get, &Params::new()).await
    }
}
