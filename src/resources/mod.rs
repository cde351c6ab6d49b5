//! Resource accessors.
//!
//! One accessor per provider resource type, each wrapping the shared
//! [`ApiClient`](crate::api::ApiClient) with resource-specific endpoint
//! knowledge, list/show/create/mutate operations, and name↔id resolution.
//!
//! Accessors for provider-curated listings (images, snapshots, regions,
//! sizes, SSH keys) memoize their `list()` result per accessor instance,
//! since most commands resolve a name before the actual call and would
//! otherwise fetch the same listing twice. The cache dies with the
//! accessor, which is constructed once per CLI invocation; it is never
//! process-wide, so a long-lived embedder gets fresh data per accessor.
//! Droplet listings are never memoized: mutations within one invocation
//! must observe fresh data.

pub mod droplet;
pub mod event;
pub mod image;
pub mod region;
pub mod size;
pub mod snapshot;
pub mod sshkey;

pub use droplet::{BackupsAction, CreateDroplet, Droplets};
pub use event::Events;
pub use image::Images;
pub use region::Regions;
pub use size::Sizes;
pub use snapshot::Snapshots;
pub use sshkey::SshKeys;

use crate::api::Record;

/// Finds the first record whose `name` equals `name`, case-insensitively.
pub(crate) fn find_by_name<'a>(records: &'a [Record], name: &str) -> Option<&'a Record> {
    records
        .iter()
        .find(|r| r.name().is_ok_and(|n| n.eq_ignore_ascii_case(name)))
}

/// Counts records whose `name` equals `name`, case-insensitively.
pub(crate) fn count_by_name(records: &[Record], name: &str) -> usize {
    records
        .iter()
        .filter(|r| r.name().is_ok_and(|n| n.eq_ignore_ascii_case(name)))
        .count()
}
