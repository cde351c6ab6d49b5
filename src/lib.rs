// ============================================================================
// Linting - Dangerous or non-idiomatic practices are flagged
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::redundant_clone)]     // Useless clones warning

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Coracle
//!
//! A command-line client for droplet management on a cloud provider's
//! HTTP API.
//!
//! ## Overview
//!
//! Coracle turns subcommands into provider API calls, letting you:
//!
//! - Create, inspect, and destroy droplets by hostname
//! - Snapshot, restore, rebuild, rename, and resize droplets
//! - Browse images, regions, and sizes
//! - Register and manage SSH keys
//! - Follow asynchronous provider events to completion
//!
//! ## Architecture
//!
//! Three layers sit between a subcommand and the wire:
//!
//! 1. **Transport** ([`api::Transport`]): one HTTP round trip, credential
//!    injection, and the error taxonomy. A canned responder substitutes
//!    for it offline.
//! 2. **Rendering** ([`api::ApiClient`]): every response passes through a
//!    single normalization point that extracts records or scalars from
//!    the payload.
//! 3. **Resources** ([`resources`]): one accessor per resource type, each
//!    translating human-friendly names into provider ids and wrapping
//!    failures with resource context.
//!
//! ## Modules
//!
//! - [`api`]: transport, response shaping, and the mock responder
//! - [`resources`]: per-resource accessors
//! - [`waiter`]: polling for asynchronous provider events
//! - [`config`]: configuration file and environment handling
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use coracle::api::ApiClient;
//! use coracle::resources::Droplets;
//!
//! # async fn demo() -> coracle::error::Result<()> {
//! let droplets = Droplets::new(ApiClient::mocked());
//! for droplet in droplets.list().await? {
//!     println!("{}", droplet.name().unwrap_or("?"));
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod resources;
pub mod waiter;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{ApiClient, Credentials, Method, Params, Record, Shaped, Transport};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::Config;
pub use error::{CoracleError, Result};
pub use resources::{
    BackupsAction, CreateDroplet, Droplets, Events, Images, Regions, Sizes, Snapshots, SshKeys,
};
pub use waiter::Waiter;
