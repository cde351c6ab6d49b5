//! Droplet accessor.
//!
//! Droplet listings are never memoized: creation and rename check the
//! current listing for hostname collisions, and a stale snapshot would
//! defeat the check. The collision check itself is read-then-write against
//! a provider with no server-side uniqueness constraint, so a concurrent
//! external mutation can still slip a duplicate in; that race is inherent
//! to the API and is documented rather than papered over.

use tracing::{debug, info};

use crate::api::{ApiClient, Method, Params, Record};
use crate::error::{DropletError, Result};

use super::image::Images;
use super::region::Regions;
use super::size::Sizes;
use super::snapshot::Snapshots;
use super::sshkey::SshKeys;

/// Parameters for droplet creation.
///
/// Name, size, image, and region are all required; validation happens
/// before any network call.
#[derive(Debug, Clone, Default)]
pub struct CreateDroplet {
    /// Hostname for the droplet.
    pub name: Option<String>,
    /// Size name ("512MB", "1GB", ...).
    pub size: Option<String>,
    /// Image name to boot from.
    pub image: Option<String>,
    /// Region name to boot in.
    pub region: Option<String>,
    /// Registered SSH key names to associate.
    pub keys: Option<Vec<String>>,
    /// Disable VirtIO (not recommended).
    pub disable_virtio: bool,
    /// Assign a private address where available.
    pub private_networking: bool,
}

impl CreateDroplet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hostname.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the size name.
    #[must_use]
    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Sets the image name.
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the region name.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the SSH key names.
    #[must_use]
    pub fn keys(mut self, keys: Vec<String>) -> Self {
        self.keys = Some(keys);
        self
    }
}

/// Which way to toggle automatic backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupsAction {
    /// Turn backups on.
    Enable,
    /// Turn backups off.
    Disable,
}

/// Manages operations related to droplets.
#[derive(Debug)]
pub struct Droplets {
    client: ApiClient,
    sizes: Sizes,
    images: Images,
    regions: Regions,
    snapshots: Snapshots,
    ssh_keys: SshKeys,
}

impl Droplets {
    /// Creates a droplet accessor over the given client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            sizes: Sizes::new(client.clone()),
            images: Images::new(client.clone()),
            regions: Regions::new(client.clone()),
            snapshots: Snapshots::new(client.clone()),
            ssh_keys: SshKeys::new(client.clone()),
            client,
        }
    }

    /// Lists all droplets. Always fetched fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .client
            .get("droplets", "/droplets")
            .await
            .and_then(|shaped| Ok(shaped.into_many("droplets")?))
            .map_err(DropletError::api)?;
        Ok(records)
    }

    /// Returns true when every droplet hostname in the account is unique.
    ///
    /// Uniqueness is checked globally, not just for one queried name, so
    /// users learn about collisions elsewhere in their account before those
    /// collisions break an operation.
    async fn names_are_unique(&self) -> Result<bool> {
        let records = self.list().await?;
        let mut names: Vec<String> = records
            .iter()
            .filter_map(|r| r.name().ok().map(str::to_lowercase))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        Ok(names.len() == total && total == records.len())
    }

    /// Translates a hostname into its droplet id.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::Ambiguous`] when any hostname in the account
    /// is duplicated, and [`DropletError::NotFound`] when no droplet
    /// matches.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        if !self.names_are_unique().await? {
            return Err(DropletError::Ambiguous {
                name: name.to_string(),
            }
            .into());
        }
        let records = self.list().await?;
        match super::find_by_name(&records, name) {
            Some(record) => Ok(record.id().map_err(DropletError::api)?),
            None => Err(DropletError::NotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Translates a droplet id into its hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if the droplet cannot be fetched.
    pub async fn name_from_id(&self, id: u64) -> Result<String> {
        let record = self.show_id(id).await?;
        Ok(record.name().map_err(DropletError::api)?.to_string())
    }

    /// Retrieves information about a single droplet.
    ///
    /// # Errors
    ///
    /// Same resolution semantics as [`Droplets::id_from_name`].
    pub async fn show(&self, name: &str) -> Result<Record> {
        let id = self.id_from_name(name).await?;
        self.show_id(id).await
    }

    /// Retrieves a droplet's status string.
    ///
    /// # Errors
    ///
    /// Same resolution semantics as [`Droplets::id_from_name`].
    pub async fn status(&self, name: &str) -> Result<String> {
        let record = self.show(name).await?;
        Ok(record.str_field("status").map_err(DropletError::api)?.to_string())
    }

    /// Fetches one droplet record directly by id, skipping name
    /// resolution. Waiting code polls through this.
    ///
    /// # Errors
    ///
    /// Returns an error if the droplet cannot be fetched.
    pub async fn show_id(&self, id: u64) -> Result<Record> {
        let record = self
            .client
            .get("droplet", &format!("/droplets/{id}"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("droplet")?))
            .map_err(DropletError::api)?;
        Ok(record)
    }

    /// Creates a droplet and returns its record.
    ///
    /// Refuses to create two droplets with an identical hostname, checked
    /// against the current listing snapshot. An absent key list is
    /// normalized to empty; `disable_virtio` is translated into the
    /// provider's inverted `virtio` flag.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::MissingField`] when any of name, size,
    /// image, or region is absent, [`DropletError::Duplicate`] for a
    /// hostname collision, and resolution errors for unknown size, image,
    /// region, or key names.
    pub async fn create(&self, request: &CreateDroplet) -> Result<Record> {
        let (Some(name), Some(size), Some(image), Some(region)) = (
            request.name.as_deref(),
            request.size.as_deref(),
            request.image.as_deref(),
            request.region.as_deref(),
        ) else {
            return Err(DropletError::MissingField.into());
        };

        let existing = self.list().await?;
        if super::find_by_name(&existing, name).is_some() {
            return Err(DropletError::Duplicate {
                name: name.to_string(),
            }
            .into());
        }

        let keys = request.keys.clone().unwrap_or_default();

        let size_id = self.sizes.id_from_name(size).await?;
        let image_id = self.images.id_from_name(image).await?;
        let region_id = self.regions.id_from_name(region).await?;

        let registered = self.ssh_keys.list().await?;
        let ssh_key_ids: Vec<String> = registered
            .iter()
            .filter(|k| {
                k.name()
                    .is_ok_and(|n| keys.iter().any(|wanted| wanted.eq_ignore_ascii_case(n)))
            })
            .filter_map(|k| k.id().ok().map(|id| id.to_string()))
            .collect();

        let mut params = Params::new();
        params.insert(String::from("name"), name.to_string());
        params.insert(String::from("size_id"), size_id.to_string());
        params.insert(String::from("image_id"), image_id.to_string());
        params.insert(String::from("region_id"), region_id.to_string());
        if !ssh_key_ids.is_empty() {
            params.insert(String::from("ssh_key_ids"), ssh_key_ids.join(","));
        }
        if !request.disable_virtio {
            params.insert(String::from("virtio"), String::from("1"));
        }
        if request.private_networking {
            params.insert(String::from("private_networking"), String::from("1"));
        }

        info!("creating droplet {name} ({size} using {image} in {region})");
        let record = self
            .client
            .render("droplet", "/droplets/new", Method::Get, &params)
            .await
            .and_then(|shaped| Ok(shaped.into_one("droplet")?))
            .map_err(DropletError::api)?;
        Ok(record)
    }

    /// Boots a droplet. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn start(&self, name: &str) -> Result<u64> {
        self.action(name, "power_on", Method::Get, Params::new())
            .await
    }

    /// Sends an ACPI shutdown signal to a droplet. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn shutdown(&self, name: &str) -> Result<u64> {
        self.action(name, "shutdown", Method::Post, Params::new())
            .await
    }

    /// Reboots a droplet. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn reboot(&self, name: &str) -> Result<u64> {
        self.action(name, "reboot", Method::Get, Params::new()).await
    }

    /// Power cycles a droplet. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn power_cycle(&self, name: &str) -> Result<u64> {
        self.action(name, "power_cycle", Method::Get, Params::new())
            .await
    }

    /// Powers a droplet down hard. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn power_off(&self, name: &str) -> Result<u64> {
        self.action(name, "power_off", Method::Get, Params::new())
            .await
    }

    /// Snapshots a droplet (must be shut down first). Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn snapshot(&self, name: &str, snapshot_name: &str) -> Result<u64> {
        let mut params = Params::new();
        params.insert(String::from("name"), snapshot_name.to_string());
        self.action(name, "snapshot", Method::Get, params).await
    }

    /// Restores a droplet from a snapshot (must be shut down first).
    /// Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if either name fails to resolve or the request
    /// fails.
    pub async fn restore(&self, name: &str, snapshot_name: &str) -> Result<u64> {
        let snapshot_id = self.snapshots.id_from_name(snapshot_name).await?;
        let mut params = Params::new();
        params.insert(String::from("image_id"), snapshot_id.to_string());
        self.action(name, "restore", Method::Get, params).await
    }

    /// Rebuilds a droplet from a stock image (must be shut down first).
    /// Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if either name fails to resolve or the request
    /// fails.
    pub async fn rebuild(&self, name: &str, image_name: &str) -> Result<u64> {
        let image_id = self.images.id_from_name(image_name).await?;
        let mut params = Params::new();
        params.insert(String::from("image_id"), image_id.to_string());
        self.action(name, "rebuild", Method::Get, params).await
    }

    /// Renames a droplet (must be shut down first). Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::Duplicate`] when the target name is already
    /// taken, or an error if resolution or the request fails.
    pub async fn rename(&self, from: &str, to: &str) -> Result<u64> {
        let existing = self.list().await?;
        if super::find_by_name(&existing, to).is_some() {
            return Err(DropletError::Duplicate {
                name: to.to_string(),
            }
            .into());
        }
        let mut params = Params::new();
        params.insert(String::from("name"), to.to_string());
        self.action(from, "rename", Method::Get, params).await
    }

    /// Resizes a droplet (must be shut down first). Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if either name fails to resolve or the request
    /// fails.
    pub async fn resize(&self, name: &str, size: &str) -> Result<u64> {
        let size_id = self.sizes.id_from_name(size).await?;
        let mut params = Params::new();
        params.insert(String::from("size_id"), size_id.to_string());
        self.action(name, "resize", Method::Get, params).await
    }

    /// Destroys a droplet. Returns the event id.
    ///
    /// `scrub` requests a secure erase of the underlying drive.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn destroy(&self, name: &str, scrub: bool) -> Result<u64> {
        let mut params = Params::new();
        params.insert(
            String::from("scrub_data"),
            String::from(if scrub { "1" } else { "0" }),
        );
        self.action(name, "destroy", Method::Get, params).await
    }

    /// Enables or disables automatic backups. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn backups(&self, action: BackupsAction, name: &str) -> Result<u64> {
        let endpoint = match action {
            BackupsAction::Enable => "enable_backups",
            BackupsAction::Disable => "disable_backups",
        };
        self.action(name, endpoint, Method::Get, Params::new())
            .await
    }

    /// Resets the root password (results in an email to the registered
    /// account). Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or the request fails.
    pub async fn password_reset(&self, name: &str) -> Result<u64> {
        self.action(name, "password_reset", Method::Get, Params::new())
            .await
    }

    /// Resolves `name` and issues one droplet action, returning the event
    /// id the provider opened for it.
    async fn action(
        &self,
        name: &str,
        endpoint: &str,
        method: Method,
        params: Params,
    ) -> Result<u64> {
        let id = self.id_from_name(name).await?;
        debug!("droplet {id}: {endpoint}");
        let event_id = self
            .client
            .render(
                "event_id",
                &format!("/droplets/{id}/{endpoint}"),
                method,
                &params,
            )
            .await
            .and_then(|shaped| Ok(shaped.into_number("event_id")?))
            .map_err(DropletError::api)?;
        Ok(event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockTransport, Transport};
    use crate::error::{CoracleError, ImageError, SizeError, SnapshotError};
    use std::sync::Arc;

    fn droplets() -> Droplets {
        Droplets::new(ApiClient::mocked())
    }

    fn full_request() -> CreateDroplet {
        CreateDroplet::new()
            .name("newfoo")
            .size("512MB")
            .image("Bar 6.0 x64")
            .region("Bardam 1")
            .keys(vec![String::from("foobarbaz")])
    }

    #[tokio::test]
    async fn lists_the_three_fixture_droplets() {
        let records = droplets().list().await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name().unwrap()).collect();
        assert_eq!(names, ["foo", "bar", "baz"]);
    }

    #[tokio::test]
    async fn resolves_hostnames() {
        let accessor = droplets();
        assert_eq!(accessor.id_from_name("foo").await.unwrap(), 1);
        assert_eq!(accessor.id_from_name("BAR").await.unwrap(), 2);

        let err = accessor.id_from_name("qux").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_hostnames_anywhere_make_resolution_ambiguous() {
        // Seed a second "baz" through the raw transport, bypassing the
        // accessor's own duplicate check.
        let mock = MockTransport::new();
        let mut params = Params::new();
        params.insert(String::from("name"), String::from("baz"));
        mock.request("/droplets/new", Method::Post, &params)
            .await
            .unwrap();

        let accessor = Droplets::new(ApiClient::new(Arc::new(mock)));
        let err = accessor.id_from_name("foo").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::Ambiguous { .. })
        ));
    }

    #[tokio::test]
    async fn name_from_id_round_trips() {
        let accessor = droplets();
        assert_eq!(accessor.name_from_id(2).await.unwrap(), "bar");

        let id = accessor.id_from_name("bar").await.unwrap();
        assert_eq!(accessor.name_from_id(id).await.unwrap(), "bar");
    }

    #[tokio::test]
    async fn show_is_idempotent_within_one_accessor() {
        let accessor = droplets();
        let first = accessor.show("foo").await.unwrap();
        let second = accessor.show("foo").await.unwrap();
        assert_eq!(first.id().unwrap(), second.id().unwrap());
        assert_eq!(first.id().unwrap(), 1);
    }

    #[tokio::test]
    async fn status_reads_the_fixture_status() {
        assert_eq!(droplets().status("foo").await.unwrap(), "active");
    }

    #[tokio::test]
    async fn create_resolves_names_to_fixture_ids() {
        let record = droplets().create(&full_request()).await.unwrap();
        assert_eq!(record.u64_field("size_id").unwrap(), 1);
        assert_eq!(record.u64_field("image_id").unwrap(), 3);
        assert_eq!(record.u64_field("region_id").unwrap(), 2);
    }

    #[tokio::test]
    async fn create_refuses_duplicate_hostnames() {
        let accessor = droplets();
        accessor.create(&full_request()).await.unwrap();

        let err = accessor.create(&full_request()).await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn create_validates_required_fields_before_any_call() {
        let err = droplets().create(&CreateDroplet::new()).await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::MissingField)
        ));

        let err = droplets()
            .create(&CreateDroplet::new().name("solo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::MissingField)
        ));
    }

    #[tokio::test]
    async fn power_transitions_return_event_ids() {
        let accessor = droplets();
        assert!(accessor.start("foo").await.unwrap() > 0);
        assert!(accessor.shutdown("foo").await.unwrap() > 0);
        assert!(accessor.reboot("foo").await.unwrap() > 0);
        assert!(accessor.power_cycle("foo").await.unwrap() > 0);
        assert!(accessor.power_off("foo").await.unwrap() > 0);

        let err = accessor.start("non-existant").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn snapshot_restore_and_rebuild() {
        let accessor = droplets();
        assert!(accessor.snapshot("foo", "snapshot-new").await.unwrap() > 0);
        assert!(accessor.restore("foo", "snapshot-foo").await.unwrap() > 0);
        assert!(
            accessor
                .rebuild("foo", "Foobuntu 12.04 x64")
                .await
                .unwrap()
                > 0
        );

        let err = accessor.restore("foo", "not-snapshot").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Snapshot(SnapshotError::NotFound { .. })
        ));

        let err = accessor.rebuild("foo", "not-an-image").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Image(ImageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rename_refuses_existing_target_names() {
        let accessor = droplets();
        assert!(accessor.rename("foo", "foofoo").await.unwrap() > 0);

        let err = accessor.rename("bar", "baz").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn resize_resolves_the_size_name() {
        let accessor = droplets();
        assert!(accessor.resize("foo", "1GB").await.unwrap() > 0);

        let err = accessor.resize("foo", "64MB").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Size(SizeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn destroy_backups_and_password_reset() {
        let accessor = droplets();
        assert!(accessor.destroy("foo", true).await.unwrap() > 0);
        assert!(
            accessor
                .backups(BackupsAction::Enable, "bar")
                .await
                .unwrap()
                > 0
        );
        assert!(
            accessor
                .backups(BackupsAction::Disable, "bar")
                .await
                .unwrap()
                > 0
        );
        assert!(accessor.password_reset("bar").await.unwrap() > 0);
    }
}
