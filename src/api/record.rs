//! Generic attribute-bag records and payload shaping.
//!
//! The provider keys every response by resource-type name and does not
//! publish a stable schema beyond "has an id and usually a name", so
//! responses are normalized into open [`Record`] bags instead of fixed
//! structs. Accessors fail with a clear [`ShapeError`] on missing or
//! mistyped attributes rather than panicking.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ShapeError;

/// Maximum payload excerpt length carried inside shaping errors.
const PAYLOAD_EXCERPT_LEN: usize = 120;

/// A generic open attribute bag built from one element of an API response.
///
/// Keys are provider-defined strings (`id`, `name`, `status`, `size_id`,
/// `ip_address`, ...); values are strings, numbers, booleans, nulls, nested
/// mappings, or sequences. Records are created fresh on every response and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a record from a decoded JSON mapping.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns the raw value for `attribute`, if present.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields.get(attribute)
    }

    /// Returns the value for `attribute`, or a [`ShapeError`] naming it.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::MissingAttribute`] when the key is absent.
    pub fn require(&self, attribute: &str) -> Result<&Value, ShapeError> {
        self.fields
            .get(attribute)
            .ok_or_else(|| ShapeError::MissingAttribute {
                attribute: attribute.to_string(),
            })
    }

    /// Returns the record's provider-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is absent or not an unsigned integer.
    pub fn id(&self) -> Result<u64, ShapeError> {
        self.u64_field("id")
    }

    /// Returns the record's user-facing name.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is absent or not a string.
    pub fn name(&self) -> Result<&str, ShapeError> {
        self.str_field("name")
    }

    /// Returns a string attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is absent or not a string.
    pub fn str_field(&self, attribute: &str) -> Result<&str, ShapeError> {
        self.require(attribute)?
            .as_str()
            .ok_or_else(|| ShapeError::WrongType {
                attribute: attribute.to_string(),
                expected: "string",
            })
    }

    /// Returns an unsigned integer attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute is absent or not an unsigned
    /// integer.
    pub fn u64_field(&self, attribute: &str) -> Result<u64, ShapeError> {
        self.require(attribute)?
            .as_u64()
            .ok_or_else(|| ShapeError::WrongType {
                attribute: attribute.to_string(),
                expected: "unsigned integer",
            })
    }

    /// Iterates over all attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Returns true when the record carries no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the record, returning the underlying mapping.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }
}

/// The normalized form of one API response: a sequence of records, a single
/// record, or a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// The expected key held a sequence of mappings.
    Many(Vec<Record>),
    /// The expected key held a single mapping.
    One(Record),
    /// The expected key held a number (e.g. `event_id`).
    Number(u64),
    /// The expected key held a string (e.g. a bare `"OK"` status).
    Text(String),
}

impl Shaped {
    /// Extracts `key` from a decoded payload and normalizes its value.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::MissingKey`] when the key is absent and
    /// [`ShapeError::Malformed`] when its value is not a sequence of
    /// mappings, a mapping, or a scalar.
    pub fn from_payload(key: &str, payload: &Value) -> Result<Self, ShapeError> {
        let content = payload.get(key).ok_or_else(|| ShapeError::MissingKey {
            key: key.to_string(),
            payload: excerpt(payload),
        })?;

        match content {
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(fields) => records.push(Record::new(fields.clone())),
                        _ => {
                            return Err(ShapeError::Malformed {
                                key: key.to_string(),
                                payload: excerpt(content),
                            });
                        }
                    }
                }
                Ok(Self::Many(records))
            }
            Value::Object(fields) => Ok(Self::One(Record::new(fields.clone()))),
            Value::Number(n) => n.as_u64().map(Self::Number).ok_or(ShapeError::Malformed {
                key: key.to_string(),
                payload: excerpt(content),
            }),
            Value::String(s) => Ok(Self::Text(s.clone())),
            _ => Err(ShapeError::Malformed {
                key: key.to_string(),
                payload: excerpt(content),
            }),
        }
    }

    /// Unwraps a sequence of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the shaped value is not a sequence.
    pub fn into_many(self, key: &str) -> Result<Vec<Record>, ShapeError> {
        match self {
            Self::Many(records) => Ok(records),
            other => Err(unexpected(key, "sequence", &other)),
        }
    }

    /// Unwraps a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the shaped value is not a single mapping.
    pub fn into_one(self, key: &str) -> Result<Record, ShapeError> {
        match self {
            Self::One(record) => Ok(record),
            other => Err(unexpected(key, "mapping", &other)),
        }
    }

    /// Unwraps a numeric scalar.
    ///
    /// # Errors
    ///
    /// Returns an error if the shaped value is not a number.
    pub fn into_number(self, key: &str) -> Result<u64, ShapeError> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(unexpected(key, "number", &other)),
        }
    }

    /// Unwraps a string scalar.
    ///
    /// # Errors
    ///
    /// Returns an error if the shaped value is not a string.
    pub fn into_text(self, key: &str) -> Result<String, ShapeError> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(unexpected(key, "string", &other)),
        }
    }
}

fn unexpected(key: &str, expected: &'static str, found: &Shaped) -> ShapeError {
    ShapeError::Unexpected {
        key: key.to_string(),
        expected,
        found: match found {
            Shaped::Many(_) => "sequence",
            Shaped::One(_) => "mapping",
            Shaped::Number(_) => "number",
            Shaped::Text(_) => "string",
        },
    }
}

/// Truncates a payload for inclusion in error messages.
fn excerpt(value: &Value) -> String {
    let mut rendered = value.to_string();
    if rendered.len() > PAYLOAD_EXCERPT_LEN {
        rendered.truncate(PAYLOAD_EXCERPT_LEN);
        rendered.push_str("...");
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_sequence_into_records() {
        let payload = json!({"droplets": [{"id": 1, "name": "foo"}, {"id": 2, "name": "bar"}]});
        let shaped = Shaped::from_payload("droplets", &payload).unwrap();
        let records = shaped.into_many("droplets").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id().unwrap(), 1);
        assert_eq!(records[1].name().unwrap(), "bar");
    }

    #[test]
    fn shapes_mapping_into_single_record() {
        let payload = json!({"droplet": {"id": 7, "name": "foo", "status": "active"}});
        let record = Shaped::from_payload("droplet", &payload)
            .unwrap()
            .into_one("droplet")
            .unwrap();
        assert_eq!(record.str_field("status").unwrap(), "active");
    }

    #[test]
    fn shapes_scalars() {
        let payload = json!({"event_id": 12345, "status": "OK"});
        let id = Shaped::from_payload("event_id", &payload)
            .unwrap()
            .into_number("event_id")
            .unwrap();
        assert_eq!(id, 12345);

        let status = Shaped::from_payload("status", &payload)
            .unwrap()
            .into_text("status")
            .unwrap();
        assert_eq!(status, "OK");
    }

    #[test]
    fn missing_key_is_an_error() {
        let payload = json!({"droplets": []});
        let err = Shaped::from_payload("images", &payload).unwrap_err();
        assert!(matches!(err, ShapeError::MissingKey { .. }));
    }

    #[test]
    fn malformed_content_is_an_error() {
        let payload = json!({"droplets": true});
        let err = Shaped::from_payload("droplets", &payload).unwrap_err();
        assert!(matches!(err, ShapeError::Malformed { .. }));

        let payload = json!({"droplets": [1, 2, 3]});
        let err = Shaped::from_payload("droplets", &payload).unwrap_err();
        assert!(matches!(err, ShapeError::Malformed { .. }));
    }

    #[test]
    fn wrong_shape_request_is_an_error() {
        let payload = json!({"droplet": {"id": 1}});
        let shaped = Shaped::from_payload("droplet", &payload).unwrap();
        let err = shaped.into_many("droplet").unwrap_err();
        assert!(matches!(err, ShapeError::Unexpected { .. }));
    }

    #[test]
    fn record_accessors_fail_clearly() {
        let record = Record::new(
            json!({"id": 1, "name": "foo"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(matches!(
            record.str_field("status").unwrap_err(),
            ShapeError::MissingAttribute { .. }
        ));
        assert!(matches!(
            record.u64_field("name").unwrap_err(),
            ShapeError::WrongType { .. }
        ));
    }
}
