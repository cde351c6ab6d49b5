//! Image accessor.

use std::collections::BTreeSet;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::{ApiClient, Record};
use crate::error::{ImageError, Result};

use super::find_by_name;

/// Manages operations related to images.
#[derive(Debug)]
pub struct Images {
    client: ApiClient,
    listing: OnceCell<Vec<Record>>,
}

impl Images {
    /// Creates an image accessor over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            listing: OnceCell::const_new(),
        }
    }

    /// Lists available images. Memoized per accessor instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .listing
            .get_or_try_init(|| async {
                debug!("fetching image listing");
                self.client
                    .get("images", "/images")
                    .await
                    .and_then(|shaped| Ok(shaped.into_many("images")?))
                    .map_err(ImageError::api)
            })
            .await?;
        Ok(records.clone())
    }

    /// Shows details for a single image.
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
            .map_err(ImageError::api)?;
        Ok(record)
    }

    /// Returns the distinct operating-system flavours across all images.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn oses(&self) -> Result<Vec<String>> {
        let records = self.list().await?;
        let mut flavours = BTreeSet::new();
        for image in &records {
            flavours.insert(
                image
                    .str_field("distribution")
                    .map_err(ImageError::api)?
                    .to_string(),
            );
        }
        Ok(flavours.into_iter().collect())
    }

    /// Translates an image name into its id.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::NotFound`] when no image matches.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        let records = self.list().await?;
        match find_by_name(&records, name) {
            Some(record) => Ok(record.id().map_err(ImageError::api)?),
            None => Err(ImageError::NotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Translates an image id into its name, via a single fetch.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::NotFoundId`] when no image matches.
    pub async fn name_from_id(&self, id: u64) -> Result<String> {
        let record = self
            .client
            .get("image", &format!("/images/{id}"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("image")?))
            .map_err(|_| ImageError::NotFoundId { id })?;
        Ok(record.name().map_err(ImageError::api)?.to_string())
    }
}
