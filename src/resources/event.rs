//! Provider event accessor.
//!
//! Asynchronous provider-side transitions (power changes, resizes,
//! snapshots, rebuilds) are identified by an event id and carry a status
//! that progresses to a terminal value.

use serde_json::Value;

use crate::api::{ApiClient, Record};
use crate::error::{EventError, Result};

/// Manages operations related to events.
#[derive(Debug)]
pub struct Events {
    client: ApiClient,
}

impl Events {
    /// Creates an event accessor over the given client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Shows details for a single event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be fetched.
    pub async fn show(&self, id: u64) -> Result<Record> {
        let record = self
            .client
            .get("event", &format!("/events/{id}"))
            .await
            .and_then(|shaped| Ok(shaped.into_one("event")?))
            .map_err(EventError::api)?;
        Ok(record)
    }

    /// Shows an event with its numeric `event_type_id` translated into a
    /// human-readable `event_type` attribute, for display.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Events::show`].
    pub async fn describe(&self, id: u64) -> Result<Record> {
        let record = self.show(id).await?;
        let mut fields = record.into_inner();
        if let Some(type_id) = fields.get("event_type_id").and_then(Value::as_u64) {
            fields.insert(
                String::from("event_type"),
                Value::String(Self::type_from_id(type_id)),
            );
        }
        Ok(Record::new(fields))
    }

    /// Translates an event type id into something human readable.
    ///
    /// The provider publishes no endpoint for this; the table covers the
    /// types observed in the wild.
    #[must_use]
    pub fn type_from_id(id: u64) -> String {
        match id {
            8 => String::from("snapshot"),
            other => format!("unknown ({other})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoracleError;

    #[tokio::test]
    async fn shows_a_completed_event() {
        let events = Events::new(ApiClient::mocked());
        let record = events.show(999).await.unwrap();
        assert_eq!(record.str_field("action_status").unwrap(), "done");
    }

    #[tokio::test]
    async fn absent_event_is_an_error() {
        let events = Events::new(ApiClient::mocked());
        let err = events.show(444).await.unwrap_err();
        assert!(matches!(err, CoracleError::Event(EventError::Api { .. })));
    }

    #[tokio::test]
    async fn describe_attaches_the_translated_type() {
        let events = Events::new(ApiClient::mocked());
        let record = events.describe(999).await.unwrap();
        assert_eq!(record.u64_field("event_type_id").unwrap(), 8);
        assert_eq!(record.str_field("event_type").unwrap(), "snapshot");
    }

    #[test]
    fn translates_known_event_types() {
        assert_eq!(Events::type_from_id(8), "snapshot");
        assert_eq!(Events::type_from_id(10), "unknown (10)");
    }
}
