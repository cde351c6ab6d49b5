//! Provisioning API plumbing: transport, payload shaping, and the offline
//! mock responder.

pub mod client;
pub mod mock;
pub mod record;
pub mod transport;

pub use client::ApiClient;
pub use mock::MockTransport;
pub use record::{Record, Shaped};
pub use transport::{API_BASE_URL, Credentials, HttpTransport, Method, Params, Transport};
