//! Droplet snapshot accessor.
//!
//! Snapshots live under the provider's `/images` endpoints, filtered to the
//! account's own images.

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::{ApiClient, Method, Params, Record};
use crate::error::{Result, SnapshotError};

use super::region::Regions;

/// Manages operations related to droplet snapshots.
#[derive(Debug)]
pub struct Snapshots {
    client: ApiClient,
    regions: Regions,
    listing: OnceCell<Vec<Record>>,
}

impl Snapshots {
    /// Creates a snapshot accessor over the given client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            regions: Regions::new(client.clone()),
            client,
            listing: OnceCell::const_new(),
        }
    }

    /// Lists the account's snapshots. Memoized per accessor instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .listing
            .get_or_try_init(|| async {
                debug!("fetching snapshot listing");
                let mut params = Params::new();
                params.insert(String::from("filter"), String::from("my_images"));
                self.client
                    .render("images", "/images", Method::Get, &params)
                    .await
                    .and_then(|shaped| Ok(shaped.into_many("images")?))
                    .map_err(SnapshotError::api)
            })
            .await?;
        Ok(records.clone())
    }

    /// Shows details for a single snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be resolved or the fetch fails.
    pub async fn show(&self, name: &str) -> Result<Record> {
        let id = self.id_from_name(name).await?;
        let record = self
            .client
            .get("image", &format!("/images/{id}"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("image")?))
            .map_err(SnapshotError::api)?;
        Ok(record)
    }

    /// Transfers a snapshot to another region. Returns the event id.
    ///
    /// # Errors
    ///
    /// Returns an error if either name fails to resolve or the request
    /// fails.
    pub async fn transfer(&self, name: &str, region: &str) -> Result<u64> {
        let id = self.id_from_name(name).await?;
        let region_id = self.regions.id_from_name(region).await?;

        let mut params = Params::new();
        params.insert(String::from("region_id"), region_id.to_string());

        let event_id = self
            .client
            .render(
                "event_id",
                &format!("/images/{id}/transfer"),
                Method::Get,
                &params,
            )
            .await
            .and_then(|shaped| Ok(shaped.into_number("event_id")?))
            .map_err(SnapshotError::api)?;
        Ok(event_id)
    }

    /// Translates a snapshot name into its id.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NotFound`] when no snapshot matches and
    /// [`SnapshotError::Ambiguous`] when more than one does.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        let records = self.list().await?;
        let matches: Vec<&Record> = records
            .iter()
            .filter(|r| r.name().is_ok_and(|n| n.eq_ignore_ascii_case(name)))
            .collect();

        match matches.as_slice() {
            [] => Err(SnapshotError::NotFound {
                name: name.to_string(),
            }
            .into()),
            [record] => Ok(record.id().map_err(SnapshotError::api)?),
            _ => Err(SnapshotError::Ambiguous {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Destroys a snapshot. Returns the provider's event record.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be resolved or the request
    /// fails.
    pub async fn destroy(&self, name: &str) -> Result<Record> {
        let id = self.id_from_name(name).await?;
        let record = self
            .client
            .get("event", &format!("/images/{id}/destroy"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("event")?))
            .map_err(SnapshotError::api)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;

    fn snapshots() -> Snapshots {
        Snapshots::new(ApiClient::mocked())
    }

    #[tokio::test]
    async fn lists_only_account_snapshots() {
        let records = snapshots().list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name().unwrap(), "snapshot-foo");
    }

    #[tokio::test]
    async fn shows_a_snapshot_by_name() {
        let record = snapshots().show("snapshot-foo").await.unwrap();
        assert_eq!(record.id().unwrap(), 1024);
    }

    #[tokio::test]
    async fn resolves_snapshot_names() {
        let accessor = snapshots();
        assert_eq!(accessor.id_from_name("snapshot-foo").await.unwrap(), 1024);

        let err = accessor.id_from_name("not-a-snapshot").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Snapshot(SnapshotError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn transfer_resolves_the_region_and_returns_an_event() {
        let event_id = snapshots()
            .transfer("snapshot-foo", "Bardam 1")
            .await
            .unwrap();
        assert!(event_id > 0);
    }

    #[tokio::test]
    async fn destroy_returns_the_event_record() {
        let record = snapshots().destroy("snapshot-foo").await.unwrap();
        assert_eq!(record.str_field("status").unwrap(), "OK");
    }
}
