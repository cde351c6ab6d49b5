//! Droplet size accessor.

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::{ApiClient, Record};
use crate::error::{Result, SizeError};

use super::count_by_name;

/// Manages operations related to droplet sizes.
#[derive(Debug)]
pub struct Sizes {
    client: ApiClient,
    listing: OnceCell<Vec<Record>>,
}

impl Sizes {
    /// Creates a size accessor over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            listing: OnceCell::const_new(),
        }
    }

    /// Lists droplet sizes. Memoized per accessor instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .listing
            .get_or_try_init(|| async {
                debug!("fetching size listing");
                self.client
                    .get("sizes", "/sizes")
                    .await
                    .and_then(|shaped| Ok(shaped.into_many("sizes")?))
                    .map_err(SizeError::api)
            })
            .await?;
        Ok(records.clone())
    }

    /// Translates a size name ("512MB", "1GB", ...) into its id.
    ///
    /// # Errors
    ///
    /// Returns [`SizeError::NotFound`] unless exactly one size matches.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        let records = self.list().await?;
        if count_by_name(&records, name) != 1 {
            return Err(SizeError::NotFound {
                name: name.to_uppercase(),
            }
            .into());
        }
        let record = super::find_by_name(&records, name).ok_or_else(|| SizeError::NotFound {
            name: name.to_uppercase(),
        })?;
        Ok(record.id().map_err(SizeError::api)?)
    }

    /// Translates a size id into its human-readable name.
    ///
    /// # Errors
    ///
    /// Returns [`SizeError::NotFoundId`] when no size matches.
    pub async fn name_from_id(&self, id: u64) -> Result<String> {
        let records = self.list().await?;
        records
            .iter()
            .find(|r| r.id().is_ok_and(|i| i == id))
            .map(|r| Ok(r.name().map_err(SizeError::api)?.to_string()))
            .unwrap_or_else(|| Err(SizeError::NotFoundId { id }.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;

    fn sizes() -> Sizes {
        Sizes::new(ApiClient::mocked())
    }

    #[tokio::test]
    async fn lists_fixture_sizes() {
        let records = sizes().list().await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn resolves_size_names() {
        let accessor = sizes();
        assert_eq!(accessor.id_from_name("512MB").await.unwrap(), 1);
        assert_eq!(accessor.id_from_name("1gb").await.unwrap(), 2);

        let err = accessor.id_from_name("64MB").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Size(SizeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn resolves_size_ids() {
        let accessor = sizes();
        assert_eq!(accessor.name_from_id(3).await.unwrap(), "2GB");

        let err = accessor.name_from_id(99).await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Size(SizeError::NotFoundId { id: 99 })
        ));
    }

    #[tokio::test]
    async fn repeated_listings_reuse_the_memoized_fetch() {
        let accessor = sizes();
        let first = accessor.list().await.unwrap();
        let second = accessor.list().await.unwrap();
        assert_eq!(first, second);
    }
}
