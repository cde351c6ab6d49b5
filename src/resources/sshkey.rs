//! SSH key accessor.

use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::{ApiClient, Method, Params, Record};
use crate::error::{Result, SshKeyError};

use super::find_by_name;

/// Manages operations related to registered SSH keys.
#[derive(Debug)]
pub struct SshKeys {
    client: ApiClient,
    listing: OnceCell<Vec<Record>>,
}

impl SshKeys {
    /// Creates an SSH key accessor over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            listing: OnceCell::const_new(),
        }
    }

    /// Lists registered SSH keys. Memoized per accessor instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn list(&self) -> Result<Vec<Record>> {
        let records = self
            .listing
            .get_or_try_init(|| async {
                debug!("fetching SSH key listing");
                self.client
                    .get("ssh_keys", "/ssh_keys")
                    .await
                    .and_then(|shaped| Ok(shaped.into_many("ssh_keys")?))
                    .map_err(SshKeyError::api)
            })
            .await?;
        Ok(records.clone())
    }

    /// Retrieves key details, including the public portion.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be resolved or the fetch fails.
    pub async fn show(&self, name: &str) -> Result<Record> {
        let id = self.id_from_name(name).await?;
        let record = self
            .client
            .get("ssh_key", &format!("/ssh_keys/{id}"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("ssh_key")?))
            .map_err(SshKeyError::api)?;
        Ok(record)
    }

    /// Registers a public key with the account.
    ///
    /// Refuses to register a second key under an existing name. The check
    /// runs against the current listing snapshot; the provider offers no
    /// server-side uniqueness guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`SshKeyError::Duplicate`] for an existing name, or an error
    /// if the request fails.
    pub async fn add(&self, name: &str, public_key: &str) -> Result<Record> {
        let existing = self.list().await?;
        if find_by_name(&existing, name).is_some() {
            return Err(SshKeyError::Duplicate {
                name: name.to_string(),
            }
            .into());
        }

        let mut params = Params::new();
        params.insert(String::from("name"), name.to_string());
        params.insert(String::from("ssh_pub_key"), public_key.to_string());

        let record = self
            .client
            .render("ssh_key", "/ssh_keys/new", Method::Get, &params)
            .await
            .and_then(|shaped| Ok(shaped.into_one("ssh_key")?))
            .map_err(SshKeyError::api)?;
        Ok(record)
    }

    /// Replaces the public portion of a registered key.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be resolved or the request
    /// fails.
    pub async fn replace(&self, name: &str, public_key: &str) -> Result<Record> {
        let id = self.id_from_name(name).await?;

        let mut params = Params::new();
        params.insert(String::from("ssh_pub_key"), public_key.to_string());

        let record = self
            .client
            .render(
                "ssh_key",
                &format!("/ssh_keys/{id}/edit"),
                Method::Get,
                &params,
            )
            .await
            .and_then(|shaped| Ok(shaped.into_one("ssh_key")?))
            .map_err(SshKeyError::api)?;
        Ok(record)
    }

    /// Deregisters an SSH key. Returns the provider's status string.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be resolved or the request
    /// fails.
    pub async fn destroy(&self, name: &str) -> Result<String> {
        let id = self.id_from_name(name).await?;
        let status = self
            .client
            .get("status", &format!("/ssh_keys/{id}/destroy"))
            .await
            .and_then(|shaped| Ok(shaped.into_text("status")?))
            .map_err(SshKeyError::api)?;
        Ok(status)
    }

    /// Translates an SSH key name into its id.
    ///
    /// # Errors
    ///
    /// Returns [`SshKeyError::NotFound`] when no key matches.
    pub async fn id_from_name(&self, name: &str) -> Result<u64> {
        let records = self.list().await?;
        match find_by_name(&records, name) {
            Some(record) => Ok(record.id().map_err(SshKeyError::api)?),
            None => Err(SshKeyError::NotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Translates an SSH key id into its name.
    ///
    /// # Errors
    ///
    /// Returns [`SshKeyError::NotFoundId`] when no key matches.
    pub async fn name_from_id(&self, id: u64) -> Result<String> {
        let records = self.list().await?;
        records
            .iter()
            .find(|r| r.id().is_ok_and(|i| i == id))
            .map(|r| Ok(r.name().map_err(SshKeyError::api)?.to_string()))
            .unwrap_or_else(|| Err(SshKeyError::NotFoundId { id }.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;

    fn keys() -> SshKeys {
        SshKeys::new(ApiClient::mocked())
    }

    #[tokio::test]
    async fn lists_fixture_keys() {
        let records = keys().list().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn shows_a_key_with_its_public_portion() {
        let record = keys().show("foobarbaz").await.unwrap();
        assert_eq!(record.name().unwrap(), "foobarbaz");
    }

    #[tokio::test]
    async fn add_registers_a_new_key() {
        let record = keys()
            .add("barbaz", "ssh-rsa AAAAB3NzaC1yc2E barbaz@host")
            .await
            .unwrap();
        assert_eq!(record.name().unwrap(), "barbaz");
    }

    #[tokio::test]
    async fn add_refuses_duplicate_names() {
        let err = keys()
            .add("foobarbaz", "ssh-rsa AAAAB3NzaC1yc2E dup@host")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoracleError::SshKey(SshKeyError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn replace_updates_the_public_key() {
        let record = keys()
            .replace("foobarbaz", "ssh-rsa AAAAB3NzaC1yc2E replaced@host")
            .await
            .unwrap();
        assert_eq!(record.name().unwrap(), "foobarbaz");
        assert_eq!(
            record.str_field("ssh_pub_key").unwrap(),
            "ssh-rsa AAAAB3NzaC1yc2E replaced@host"
        );
    }

    #[tokio::test]
    async fn destroy_returns_the_status_scalar() {
        assert_eq!(keys().destroy("foobarbaz").await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn resolves_names_and_ids() {
        let accessor = keys();
        assert_eq!(accessor.id_from_name("foobarbaz").await.unwrap(), 1);
        assert_eq!(accessor.name_from_id(1).await.unwrap(), "foobarbaz");

        let err = accessor.id_from_name("Nonexistant").await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::SshKey(SshKeyError::NotFound { .. })
        ));
        let err = accessor.name_from_id(99).await.unwrap_err();
        assert!(matches!(
            err,
            CoracleError::SshKey(SshKeyError::NotFoundId { id: 99 })
        ));
    }
}
