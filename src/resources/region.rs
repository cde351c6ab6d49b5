//! Region accessor.

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::{ApiClient, Record};
use crate::error::{RegionError, Result};

use super::find_by_name;

/// Manages operations related to regions.
#[derive(Debug)]
pub struct Regions {
    client: ApiClient,
    listing: OnceCell<Vec<Record>>,
}

impl Regions {
    /// Creates a region accessor over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            listing: OnceCell::const_new(),
        }
    }

    /// Lists regions. Memoized per accessor instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .listing
            .get_or_try_init(|| async {
                debug!("fetching region listing");
                self.client
                    .get("regions", "/regions")
                    .await
                    .and_then(|shaped| Ok(shaped.into_many("regions")?))
                    .map_err(RegionError::api)
            })
            .await?;
        Ok(records.clone())
    }

    /// Translates a region name into its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::NotFound`] when no region matches.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        let records = self.list().await?;
        match find_by_name(&records, name) {
            Some(record) => Ok(record.id().map_err(RegionError::api)?),
            None => Err(RegionError::NotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Translates a region id into its name.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::NotFoundId`] when no region matches.
    pub async fn name_from_id(&self, id: u64) -> Result<String> {
        let records = self.list().await?;
        records
            .iter()
            .find(|r| r.id().is_ok_and(|i| i == id))
            .map(|r| Ok(r.name().map_err(RegionError::api)?.to_string()))
            .unwrap_or_else(|| Err(RegionError::NotFoundId { id }.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;

    fn regions() -> Regions {
        Regions::new(ApiClient::mocked())
    }

    #[tokio::test]
    async fn lists_fixture_regions() {
        let records = regions().list().await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn resolves_names_case_insensitively() {
        let accessor = regions();
        assert_eq!(accessor.id_from_name("Foo York 1").await.unwrap(), 1);
        assert_eq!(accessor.id_from_name("bardam 1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let err = regions().id_from_name("Nonexistant").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Region(RegionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn resolves_ids_back_to_names() {
        let accessor = regions();
        assert_eq!(accessor.name_from_id(2).await.unwrap(), "Bardam 1");

        let err = accessor.name_from_id(99).await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Region(RegionError::NotFoundId { id: 99 })
        ));
    }

    #[tokio::test]
    async fn round_trips_unique_names() {
        let accessor = regions();
        let id = accessor.id_from_name("Bardam 1").await.unwrap();
        assert_eq!(accessor.name_from_id(id).await.unwrap(), "Bardam 1");
    }
}
