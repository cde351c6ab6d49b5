//! Polling loops for asynchronous provider transitions.
//!
//! Power changes, snapshots, resizes, and similar operations return an
//! event id immediately and complete in the background. [`Waiter`] polls
//! at a fixed interval until the watched status reaches its terminal
//! value. Waits are unbounded unless a deadline is set; the provider
//! finishes or fails every event eventually, and an arbitrary default
//! cutoff would turn slow-but-successful operations into spurious errors.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::api::Record;
use crate::error::{DropletError, EventError, Result};
use crate::resources::{Droplets, Events};

/// Terminal status of a finished event.
pub const EVENT_DONE: &str = "done";

/// Seconds between polls.
const POLL_INTERVAL_SECS: u64 = 1;

/// Polls events and droplets until they reach a target status.
#[derive(Debug, Clone)]
pub struct Waiter {
    interval: Duration,
    deadline: Option<Duration>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter {
    /// Creates a waiter with a one second interval and no deadline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interval: Duration::from_secs(POLL_INTERVAL_SECS),
            deadline: None,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the total wait. Elapsing it raises a timeout error.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Waits until the event's `action_status` becomes `done` and returns
    /// its final record.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Timeout`] when a deadline is set and elapses,
    /// or any error the event fetch produces.
    pub async fn wait_for_event(&self, events: &Events, id: u64) -> Result<Record> {
        self.wait_for_event_with(events, id, |_| {}).await
    }

    /// Like [`Waiter::wait_for_event`], invoking `progress` with each
    /// non-terminal record observed.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Waiter::wait_for_event`].
    pub async fn wait_for_event_with(
        &self,
        events: &Events,
        id: u64,
        mut progress: impl FnMut(&Record),
    ) -> Result<Record> {
        let started = Instant::now();
        loop {
            let record = events.show(id).await?;
            let status = record.str_field("action_status").map_err(EventError::api)?;
            if status == EVENT_DONE {
                debug!("event {id} finished");
                return Ok(record);
            }
            progress(&record);

            if self.expired(started) {
                return Err(EventError::Timeout {
                    id,
                    target: EVENT_DONE.to_string(),
                }
                .into());
            }
            sleep(self.interval).await;
        }
    }

    /// Waits until the droplet's `status` equals `target` and returns its
    /// final record.
    ///
    /// # Errors
    ///
    /// Returns [`DropletError::Timeout`] when a deadline is set and
    /// elapses, or any error the droplet fetch produces.
    pub async fn wait_for_droplet(
        &self,
        droplets: &Droplets,
        id: u64,
        target: &str,
    ) -> Result<Record> {
        let started = Instant::now();
        loop {
            let record = droplets.show_id(id).await?;
            let status = record.str_field("status").map_err(DropletError::api)?;
            if status == target {
                debug!("droplet {id} reached '{target}'");
                return Ok(record);
            }

            if self.expired(started) {
                return Err(DropletError::Timeout {
                    id,
                    target: target.to_string(),
                }
                .into());
            }
            sleep(self.interval).await;
        }
    }

    fn expired(&self, started: Instant) -> bool {
        self.deadline
            .is_some_and(|deadline| started.elapsed() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::error::CoracleError;
    use crate::resources::CreateDroplet;

    #[tokio::test(start_paused = true)]
    async fn waits_for_a_fresh_event_to_finish() {
        let client = ApiClient::mocked();
        let droplets = Droplets::new(client.clone());
        let events = Events::new(client);

        let event_id = droplets.reboot("foo").await.unwrap();
        let record = Waiter::new()
            .wait_for_event(&events, event_id)
            .await
            .unwrap();
        assert_eq!(record.str_field("action_status").unwrap(), EVENT_DONE);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_progress_while_waiting() {
        let client = ApiClient::mocked();
        let droplets = Droplets::new(client.clone());
        let events = Events::new(client);

        let event_id = droplets.power_cycle("foo").await.unwrap();
        let mut polls = 0;
        Waiter::new()
            .wait_for_event_with(&events, event_id, |_| polls += 1)
            .await
            .unwrap();
        assert!(polls > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_events_return_immediately() {
        let events = Events::new(ApiClient::mocked());
        let record = Waiter::new().wait_for_event(&events, 999).await.unwrap();
        assert_eq!(record.str_field("action_status").unwrap(), EVENT_DONE);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses_into_a_timeout() {
        let client = ApiClient::mocked();
        let droplets = Droplets::new(client.clone());
        let events = Events::new(client);

        let event_id = droplets.power_off("foo").await.unwrap();
        let err = Waiter::new()
            .with_deadline(Duration::ZERO)
            .wait_for_event(&events, event_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Event(EventError::Timeout { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_a_new_droplet_to_become_active() {
        let droplets = Droplets::new(ApiClient::mocked());
        let request = CreateDroplet::new()
            .name("fresh")
            .size("1GB")
            .image("Foobuntu 12.04 x64")
            .region("Foo York 1");

        let created = droplets.create(&request).await.unwrap();
        assert_eq!(created.str_field("status").unwrap(), "new");

        let record = Waiter::new()
            .wait_for_droplet(&droplets, created.id().unwrap(), "active")
            .await
            .unwrap();
        assert_eq!(record.str_field("status").unwrap(), "active");
    }

    #[tokio::test(start_paused = true)]
    async fn droplet_wait_times_out_against_an_unreachable_status() {
        let droplets = Droplets::new(ApiClient::mocked());
        let err = Waiter::new()
            .with_deadline(Duration::from_secs(3))
            .wait_for_droplet(&droplets, 1, "archive")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoracleError::Droplet(DropletError::Timeout { .. })
        ));
    }
}
