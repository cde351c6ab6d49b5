//! Canned offline responder.
//!
//! [`MockTransport`] substitutes for [`HttpTransport`] behind the
//! [`Transport`] trait, matching request paths against the provider's
//! endpoint layout and answering with a fixed fixture set. It is stateful:
//! created droplets and registered keys are appended so that
//! duplicate-name checks observe them within the same invocation.
//!
//! [`HttpTransport`]: super::transport::HttpTransport

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;

use super::transport::{Method, Params, Transport};

/// Polls it takes a fresh event or droplet to reach its terminal status.
const SETTLE_TICKS: u32 = 2;

/// Offline transport answering from canned fixtures.
pub struct MockTransport {
    state: Mutex<MockState>,
}

struct MockState {
    droplets: Vec<Value>,
    images: Vec<Value>,
    snapshots: Vec<Value>,
    regions: Vec<Value>,
    sizes: Vec<Value>,
    ssh_keys: Vec<Value>,
    events: HashMap<u64, Value>,
    /// Countdown until a pending droplet or event turns terminal.
    settling: HashMap<u64, u32>,
    next_id: u64,
    next_event_id: u64,
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn droplet(id: u64, name: &str, size_id: u64, image_id: u64, region_id: u64, last: u8) -> Value {
    json!({
        "id": id,
        "name": name,
        "size_id": size_id,
        "image_id": image_id,
        "region_id": region_id,
        "status": "active",
        "ip_address": format!("192.0.2.{last}"),
        "backups_active": false,
        "created_at": timestamp(),
    })
}

impl MockState {
    fn seeded() -> Self {
        let droplets = vec![
            droplet(1, "foo", 1, 1, 2, 10),
            droplet(2, "bar", 2, 2, 2, 11),
            droplet(3, "baz", 1, 3, 1, 12),
        ];
        let images = vec![
            json!({"id": 1, "name": "Foobuntu 12.04 x64", "distribution": "Foobuntu"}),
            json!({"id": 2, "name": "Foobuntu 12.04 x32", "distribution": "Foobuntu"}),
            json!({"id": 3, "name": "Bar 6.0 x64", "distribution": "Bar"}),
        ];
        let snapshots = vec![
            json!({"id": 1024, "name": "snapshot-foo", "distribution": "Foobuntu"}),
        ];
        let regions = vec![
            json!({"id": 1, "name": "Foo York 1", "slug": "foo1"}),
            json!({"id": 2, "name": "Bardam 1", "slug": "bar1"}),
        ];
        let sizes = vec![
            json!({"id": 1, "name": "512MB"}),
            json!({"id": 2, "name": "1GB"}),
            json!({"id": 3, "name": "2GB"}),
        ];
        let ssh_keys = vec![
            json!({"id": 1, "name": "foobarbaz"}),
        ];
        let mut events = HashMap::new();
        events.insert(
            999,
            json!({
                "id": 999,
                "action_status": "done",
                "droplet_id": 1,
                "event_type_id": 8,
                "percentage": "100",
            }),
        );

        Self {
            droplets,
            images,
            snapshots,
            regions,
            sizes,
            ssh_keys,
            events,
            settling: HashMap::new(),
            next_id: 100,
            next_event_id: 7000,
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers a fresh in-progress event and returns its id.
    fn open_event(&mut self, droplet_id: u64) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.insert(
            id,
            json!({
                "id": id,
                "action_status": "in-progress",
                "droplet_id": droplet_id,
                "event_type_id": 8,
                "percentage": "0",
            }),
        );
        self.settling.insert(id, SETTLE_TICKS);
        id
    }

    /// Advances a settling countdown, flipping the payload when it ends.
    fn settle(&mut self, id: u64) -> bool {
        match self.settling.get_mut(&id) {
            Some(0) | None => true,
            Some(ticks) => {
                *ticks -= 1;
                *ticks == 0
            }
        }
    }
}

impl MockTransport {
    /// Creates a responder with the standard fixture set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::seeded()),
        }
    }

    fn respond(&self, path: &str, params: &Params) -> Result<Value, ApiError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        debug!("mock responding to {path}");

        match segments.as_slice() {
            ["droplets"] => Ok(json!({"status": "OK", "droplets": state.droplets})),
            ["droplets", "new"] => {
                let field = |key: &str| params.get(key).cloned().unwrap_or_default();
                let numeric =
                    |key: &str| params.get(key).and_then(|v| v.parse::<u64>().ok());
                let id = state.take_id();
                let created = json!({
                    "id": id,
                    "name": field("name"),
                    "size_id": numeric("size_id"),
                    "image_id": numeric("image_id"),
                    "region_id": numeric("region_id"),
                    "status": "new",
                    "created_at": timestamp(),
                });
                state.droplets.push(created.clone());
                state.settling.insert(id, SETTLE_TICKS);
                Ok(json!({"status": "OK", "droplet": created}))
            }
            ["droplets", id] => {
                let id = parse_id(id, path)?;
                if state.settle(id) {
                    if let Some(d) = state
                        .droplets
                        .iter_mut()
                        .find(|d| d["id"].as_u64() == Some(id))
                    {
                        if d["status"] == "new" {
                            d["status"] = json!("active");
                        }
                    }
                }
                state
                    .droplets
                    .iter()
                    .find(|d| d["id"].as_u64() == Some(id))
                    .map(|d| json!({"status": "OK", "droplet": d}))
                    .ok_or_else(|| ApiError::NotFound {
                        path: path.to_string(),
                    })
            }
            ["droplets", id, action] => {
                let id = parse_id(id, path)?;
                if !state
                    .droplets
                    .iter()
                    .any(|d| d["id"].as_u64() == Some(id))
                {
                    return Err(ApiError::NotFound {
                        path: path.to_string(),
                    });
                }
                if *action == "rename" {
                    if let Some(name) = params.get("name") {
                        if let Some(d) = state
                            .droplets
                            .iter_mut()
                            .find(|d| d["id"].as_u64() == Some(id))
                        {
                            d["name"] = json!(name);
                        }
                    }
                }
                let event_id = state.open_event(id);
                Ok(json!({"status": "OK", "event_id": event_id}))
            }
            ["images"] => {
                if params.get("filter").map(String::as_str) == Some("my_images") {
                    Ok(json!({"status": "OK", "images": state.snapshots}))
                } else {
                    Ok(json!({"status": "OK", "images": state.images}))
                }
            }
            ["images", id] => {
                let id = parse_id(id, path)?;
                state
                    .images
                    .iter()
                    .chain(state.snapshots.iter())
                    .find(|i| i["id"].as_u64() == Some(id))
                    .map(|i| json!({"status": "OK", "image": i}))
                    .ok_or_else(|| ApiError::NotFound {
                        path: path.to_string(),
                    })
            }
            ["images", id, "transfer"] => {
                let id = parse_id(id, path)?;
                let event_id = state.open_event(id);
                Ok(json!({"status": "OK", "event_id": event_id}))
            }
            ["images", id, "destroy"] => {
                let id = parse_id(id, path)?;
                state.snapshots.retain(|s| s["id"].as_u64() != Some(id));
                Ok(json!({"status": "OK", "event": {"id": id, "status": "OK"}}))
            }
            ["regions"] => Ok(json!({"status": "OK", "regions": state.regions})),
            ["sizes"] => Ok(json!({"status": "OK", "sizes": state.sizes})),
            ["ssh_keys"] => Ok(json!({"status": "OK", "ssh_keys": state.ssh_keys})),
            ["ssh_keys", "new"] => {
                let id = state.take_id();
                let key = json!({
                    "id": id,
                    "name": params.get("name").cloned().unwrap_or_default(),
                    "ssh_pub_key": params.get("ssh_pub_key").cloned().unwrap_or_default(),
                });
                state.ssh_keys.push(key.clone());
                Ok(json!({"status": "OK", "ssh_key": key}))
            }
            ["ssh_keys", id] => {
                let id = parse_id(id, path)?;
                state
                    .ssh_keys
                    .iter()
                    .find(|k| k["id"].as_u64() == Some(id))
                    .map(|k| json!({"status": "OK", "ssh_key": k}))
                    .ok_or_else(|| ApiError::NotFound {
                        path: path.to_string(),
                    })
            }
            ["ssh_keys", id, "edit"] => {
                let id = parse_id(id, path)?;
                let replacement = params.get("ssh_pub_key").cloned().unwrap_or_default();
                state
                    .ssh_keys
                    .iter_mut()
                    .find(|k| k["id"].as_u64() == Some(id))
                    .map(|k| {
                        k["ssh_pub_key"] = json!(replacement);
                        json!({"status": "OK", "ssh_key": k})
                    })
                    .ok_or_else(|| ApiError::NotFound {
                        path: path.to_string(),
                    })
            }
            ["ssh_keys", id, "destroy"] => {
                let id = parse_id(id, path)?;
                state.ssh_keys.retain(|k| k["id"].as_u64() != Some(id));
                Ok(json!({"status": "OK"}))
            }
            ["events", id] => {
                let id = parse_id(id, path)?;
                if state.settle(id) {
                    if let Some(event) = state.events.get_mut(&id) {
                        if event["action_status"] == "in-progress" {
                            event["action_status"] = json!("done");
                            event["percentage"] = json!("100");
                        }
                    }
                }
                state
                    .events
                    .get(&id)
                    .map(|e| json!({"status": "OK", "event": e}))
                    .ok_or_else(|| ApiError::NotFound {
                        path: path.to_string(),
                    })
            }
            _ => Err(ApiError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_id(segment: &str, path: &str) -> Result<u64, ApiError> {
    segment.parse().map_err(|_| ApiError::NotFound {
        path: path.to_string(),
    })
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        path: &str,
        _method: Method,
        params: &Params,
    ) -> Result<Value, ApiError> {
        self.respond(path, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_the_fixture_droplets() {
        let mock = MockTransport::new();
        let payload = mock
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap();
        let names: Vec<&str> = payload["droplets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["foo", "bar", "baz"]);
    }

    #[tokio::test]
    async fn created_droplets_become_visible() {
        let mock = MockTransport::new();
        let mut params = Params::new();
        params.insert(String::from("name"), String::from("newfoo"));
        params.insert(String::from("size_id"), String::from("1"));
        params.insert(String::from("image_id"), String::from("3"));
        params.insert(String::from("region_id"), String::from("2"));

        let created = mock
            .request("/droplets/new", Method::Post, &params)
            .await
            .unwrap();
        assert_eq!(created["droplet"]["size_id"], 1);

        let listing = mock
            .request("/droplets", Method::Get, &Params::new())
            .await
            .unwrap();
        assert_eq!(listing["droplets"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn fresh_events_settle_after_a_few_polls() {
        let mock = MockTransport::new();
        let payload = mock
            .request("/droplets/1/power_on", Method::Post, &Params::new())
            .await
            .unwrap();
        let event_id = payload["event_id"].as_u64().unwrap();
        let path = format!("/events/{event_id}");

        let mut statuses = Vec::new();
        for _ in 0..=SETTLE_TICKS {
            let event = mock
                .request(&path, Method::Get, &Params::new())
                .await
                .unwrap();
            statuses.push(event["event"]["action_status"].as_str().unwrap().to_string());
        }
        assert_eq!(statuses.first().map(String::as_str), Some("in-progress"));
        assert_eq!(statuses.last().map(String::as_str), Some("done"));
    }

    #[tokio::test]
    async fn unknown_single_resources_are_not_found() {
        let mock = MockTransport::new();
        for path in ["/droplets/999", "/events/444", "/images/77"] {
            let err = mock
                .request(path, Method::Get, &Params::new())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::NotFound { .. }), "{path}");
        }
    }
}
