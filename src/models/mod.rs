//! Data models for portal chat entities

mod conversation;
mod message;
mod people;

pub use conversation::*;
pub use message::*;
pub use people::*;

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Backend identifier. The portal API is inconsistent about emitting ids as
/// JSON numbers or strings, so both normalise to a string here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = RecordId;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("string or integer id")
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                Ok(RecordId(v.to_string()))
            }
        }
        d.deserialize_any(Visitor)
    }
}

/// Extract an id from a loosely-shaped JSON value: either a bare id or an
/// object carrying one of the usual id fields.
pub fn value_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(map) => ["id", "employeeId", "userId", "participantId"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(|v| match v {
                serde_json::Value::Object(_) => None,
                other => value_id(other),
            }),
        _ => None,
    }
}
