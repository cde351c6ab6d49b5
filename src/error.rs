//! Error types for the coracle client.
//!
//! The taxonomy mirrors the layering of the client itself: transport
//! failures ([`ApiError`]), payload normalization failures ([`ShapeError`]),
//! and one error kind per resource type. Resource accessors never let a
//! transport or shaping error escape unwrapped; each method re-raises as its
//! own resource error carrying the original message, so callers handle a
//! single error kind per resource.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the coracle client.
#[derive(Debug, Error)]
pub enum CoracleError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport or normalization errors surfaced directly.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Droplet operation errors.
    #[error("Droplet error: {0}")]
    Droplet(#[from] DropletError),

    /// Image operation errors.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Snapshot operation errors.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Region operation errors.
    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    /// Size operation errors.
    #[error("Size error: {0}")]
    Size(#[from] SizeError),

    /// SSH key operation errors.
    #[error("SSH key error: {0}")]
    SshKey(#[from] SshKeyError),

    /// Event operation errors.
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP transport errors, one variant per failure condition the provider
/// can produce.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider rejected the credentials (HTTP 401).
    #[error("Access denied")]
    AccessDenied,

    /// The requested resource path does not exist (HTTP 404).
    #[error("Not found: {path}")]
    NotFound {
        /// Path that was requested.
        path: String,
    },

    /// HTTP 200 with an empty or unparsable body.
    #[error("Empty or malformed response from {path}")]
    EmptyResponse {
        /// Path that was requested.
        path: String,
    },

    /// HTTP 200 carrying an explicit `error_message` field. The message is
    /// passed through verbatim.
    #[error("{message}")]
    Provider {
        /// The provider's error message.
        message: String,
    },

    /// Any other non-200 status.
    #[error("Status code: {status}, full response: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// Connection-level failure before a status code was obtained.
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
    },
}

impl ApiError {
    /// Creates a network error with the given message.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

/// Payload normalization errors raised by the shaper.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// The expected top-level key is absent from the payload.
    #[error("Missing key '{key}' in response: {payload}")]
    MissingKey {
        /// The expected key.
        key: String,
        /// Abbreviated payload for diagnostics.
        payload: String,
    },

    /// The key's value is not a sequence, mapping, or scalar.
    #[error("Malformed response under '{key}': {payload}")]
    Malformed {
        /// The expected key.
        key: String,
        /// Abbreviated payload for diagnostics.
        payload: String,
    },

    /// A record is missing a required attribute.
    #[error("Record has no attribute '{attribute}'")]
    MissingAttribute {
        /// Name of the absent attribute.
        attribute: String,
    },

    /// A record attribute is present but has an unexpected type.
    #[error("Attribute '{attribute}' is not a {expected}")]
    WrongType {
        /// Name of the attribute.
        attribute: String,
        /// Expected type description.
        expected: &'static str,
    },

    /// The shaped value is not of the kind the caller asked for.
    #[error("Expected {expected} under '{key}', got {found}")]
    Unexpected {
        /// The expected key.
        key: String,
        /// What the caller wanted.
        expected: &'static str,
        /// What the payload held.
        found: &'static str,
    },
}

/// Union of the two failure kinds that [`crate::api::ApiClient::render`]
/// can produce.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] ApiError),

    /// Normalization failure.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Droplet operation errors.
#[derive(Debug, Error)]
pub enum DropletError {
    /// No droplet matched the given name.
    #[error("No droplet named '{name}'")]
    NotFound {
        /// The queried hostname.
        name: String,
    },

    /// More than one droplet shares a hostname somewhere in the account.
    #[error("More than one droplet matches '{name}'")]
    Ambiguous {
        /// The queried hostname.
        name: String,
    },

    /// Creating or renaming would produce two droplets with one hostname.
    #[error("This would create two droplets named '{name}'")]
    Duplicate {
        /// The offending hostname.
        name: String,
    },

    /// A required creation parameter is absent.
    #[error("Name, size, image and region are all required")]
    MissingField,

    /// The waiter's deadline elapsed before the target status was seen.
    #[error("Timed out waiting for droplet {id} to become '{target}'")]
    Timeout {
        /// Droplet id being polled.
        id: u64,
        /// Status that was never observed.
        target: String,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Image operation errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// No image matched the given name.
    #[error("No image called '{name}'")]
    NotFound {
        /// The queried image name.
        name: String,
    },

    /// No image exists with the given id.
    #[error("No image found for id {id}")]
    NotFoundId {
        /// The queried id.
        id: u64,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Snapshot operation errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot matched the given name.
    #[error("No snapshot named '{name}' found")]
    NotFound {
        /// The queried snapshot name.
        name: String,
    },

    /// More than one snapshot matched the given name.
    #[error("More than one match for '{name}'")]
    Ambiguous {
        /// The queried snapshot name.
        name: String,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Region operation errors.
#[derive(Debug, Error)]
pub enum RegionError {
    /// No region matched the given name.
    #[error("No region called '{name}'")]
    NotFound {
        /// The queried region name.
        name: String,
    },

    /// No region exists with the given id.
    #[error("No region with id {id}")]
    NotFoundId {
        /// The queried id.
        id: u64,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Size operation errors.
#[derive(Debug, Error)]
pub enum SizeError {
    /// No size matched the given name.
    #[error("'{name}' is not a valid size")]
    NotFound {
        /// The queried size name.
        name: String,
    },

    /// No size exists with the given id.
    #[error("No size found for id {id}")]
    NotFoundId {
        /// The queried id.
        id: u64,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// SSH key operation errors.
#[derive(Debug, Error)]
pub enum SshKeyError {
    /// No key matched the given name.
    #[error("No key found called '{name}'")]
    NotFound {
        /// The queried key name.
        name: String,
    },

    /// No key exists with the given id.
    #[error("No key found for id {id}")]
    NotFoundId {
        /// The queried id.
        id: u64,
    },

    /// Registering would produce two keys with one name.
    #[error("Aborted: this would create two keys named '{name}'")]
    Duplicate {
        /// The offending key name.
        name: String,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Event operation errors.
#[derive(Debug, Error)]
pub enum EventError {
    /// The waiter's deadline elapsed before the target status was seen.
    #[error("Timed out waiting for event {id} to reach '{target}'")]
    Timeout {
        /// Event id being polled.
        id: u64,
        /// Status that was never observed.
        target: String,
    },

    /// Underlying transport or normalization failure.
    #[error("{message}")]
    Api {
        /// Original error message.
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error(
        "Failed to parse configuration{}: {message}",
        location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default()
    )]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A required credential is absent from both file and environment.
    #[error("Missing credential: {name}")]
    MissingCredential {
        /// Name of the absent credential.
        name: String,
    },
}

macro_rules! wrap_api_error {
    ($($err:ident),+ $(,)?) => {
        $(
            impl $err {
                /// Wraps an underlying error, preserving its message.
                #[must_use]
                pub fn api(source: impl std::fmt::Display) -> Self {
                    Self::Api {
                        message: source.to_string(),
                    }
                }
            }
        )+
    };
}

wrap_api_error!(
    DropletError,
    ImageError,
    SnapshotError,
    RegionError,
    SizeError,
    SshKeyError,
    EventError,
);

/// Result type alias for coracle operations.
pub type Result<T> = std::result::Result<T, CoracleError>;
