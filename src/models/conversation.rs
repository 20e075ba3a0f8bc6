//! Conversation models: backend records and the client-side conversation view

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Employee, RecordId};

/// Prefix of virtual conversation ids as shown to users and accepted on the CLI.
pub const VIRTUAL_ID_PREFIX: &str = "employee:";

/// Conversation type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    #[default]
    #[serde(alias = "direct", alias = "PRIVATE")]
    Private,
    #[serde(alias = "GROUP")]
    Group,
}

/// Summary of the latest message, supplied by the backend for list rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// Conversation as persisted by the backend.
///
/// Membership comes in several shapes depending on which endpoint produced
/// the record; any of the membership fields may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: RecordId,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: ConversationKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub participants: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub participant_ids: Option<Vec<RecordId>>,
    #[serde(default)]
    pub recipient_id: Option<RecordId>,
    #[serde(default)]
    pub employee_id: Option<RecordId>,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Identity of a conversation: persisted by the backend, or synthesized for a
/// roster member that has no conversation yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Persisted(String),
    /// Holds the participant id the placeholder stands for.
    Virtual(String),
}

impl ConversationId {
    pub fn for_participant(participant_id: &str) -> Self {
        ConversationId::Virtual(participant_id.to_string())
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, ConversationId::Virtual(_))
    }

    /// Backend id, if the conversation exists server-side.
    pub fn persisted(&self) -> Option<&str> {
        match self {
            ConversationId::Persisted(id) => Some(id),
            ConversationId::Virtual(_) => None,
        }
    }

    /// Participant encoded in a virtual id.
    pub fn virtual_participant(&self) -> Option<&str> {
        match self {
            ConversationId::Virtual(pid) => Some(pid),
            ConversationId::Persisted(_) => None,
        }
    }

    /// Parse a user-supplied id: `employee:<id>` is virtual, anything else persisted.
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix(VIRTUAL_ID_PREFIX) {
            Some(pid) if !pid.is_empty() => ConversationId::Virtual(pid.to_string()),
            _ => ConversationId::Persisted(s.to_string()),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationId::Persisted(id) => f.write_str(id),
            ConversationId::Virtual(pid) => write!(f, "{}{}", VIRTUAL_ID_PREFIX, pid),
        }
    }
}

/// A conversation as presented to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub kind: ConversationKind,
    pub display_name: String,
    /// Counterpart of a private conversation, whether or not the conversation is virtual.
    pub participant_ref: Option<String>,
    pub last_message: Option<LastMessage>,
    pub unread_count: u32,
}

impl Conversation {
    /// Placeholder for an employee with no persisted conversation.
    pub fn placeholder(employee: &Employee) -> Self {
        Self {
            id: ConversationId::for_participant(employee.id.as_str()),
            kind: ConversationKind::Private,
            display_name: employee.display_name(),
            participant_ref: Some(employee.id.to_string()),
            last_message: None,
            unread_count: 0,
        }
    }

    /// Build from a persisted record. `display_name` overrides the record's own name.
    pub fn from_record(
        record: &ConversationRecord,
        display_name: Option<String>,
        participant_ref: Option<String>,
    ) -> Self {
        let display_name = display_name
            .or_else(|| record.name.clone().filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| format!("Conversation {}", record.id));
        Self {
            id: ConversationId::Persisted(record.id.to_string()),
            kind: record.kind,
            display_name,
            participant_ref,
            last_message: record.last_message.clone(),
            unread_count: record.unread_count,
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    /// Timestamp of the latest message, for recency ordering.
    pub fn last_activity(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        self.last_message
            .as_ref()
            .and_then(|m| m.timestamp.as_deref())
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_id_parse_and_display() {
        let v = ConversationId::parse("employee:42");
        assert_eq!(v, ConversationId::Virtual("42".to_string()));
        assert_eq!(v.to_string(), "employee:42");
        assert_eq!(v.persisted(), None);

        let p = ConversationId::parse("981");
        assert_eq!(p.persisted(), Some("981"));
        // A bare prefix is not a participant.
        assert!(!ConversationId::parse("employee:").is_virtual());
    }

    #[test]
    fn test_record_shapes_deserialize() {
        let r: ConversationRecord = serde_json::from_value(json!({
            "id": 7,
            "type": "group",
            "name": "Kitchen",
            "unreadCount": 3,
            "lastMessage": {"content": "hi", "timestamp": "2024-05-01T10:00:00Z"}
        }))
        .unwrap();
        assert_eq!(r.id.as_str(), "7");
        assert_eq!(r.kind, ConversationKind::Group);
        assert_eq!(r.unread_count, 3);

        let r: ConversationRecord =
            serde_json::from_value(json!({"id": "c1", "participantIds": [1, "2"]})).unwrap();
        assert_eq!(r.kind, ConversationKind::Private);
        assert_eq!(r.participant_ids.unwrap().len(), 2);
    }

    #[test]
    fn test_placeholder_id_is_stable() {
        let e: Employee = serde_json::from_value(json!({"id": 42, "name": "Sam"})).unwrap();
        assert_eq!(Conversation::placeholder(&e).id, Conversation::placeholder(&e).id);
    }
}
