//! Outgoing message construction and the optimistic local copy.

use chrono::{DateTime, Utc};

use super::attachments::{self, SelectedFile};
use crate::models::{Delivery, Message, Operator, OutgoingMessage, RecordId};

/// Content used when only attachments are sent.
pub const ATTACHMENT_PLACEHOLDER: &str = "Sent an attachment";

/// Prefix of locally assigned message ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// What the operator composed.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub files: Vec<SelectedFile>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
        }
    }

    pub fn is_sendable(&self) -> bool {
        !self.text.trim().is_empty() || !self.files.is_empty()
    }
}

/// Build the outgoing payload, or `None` if there is nothing to send.
/// Files are expected to have passed `attachments::accept` already.
pub fn build_outgoing(text: &str, files: &[SelectedFile]) -> Option<OutgoingMessage> {
    let trimmed = text.trim();
    if trimmed.is_empty() && files.is_empty() {
        return None;
    }
    let content = if trimmed.is_empty() {
        ATTACHMENT_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    };
    Some(OutgoingMessage {
        content,
        text_content: trimmed.to_string(),
        has_attachments: !files.is_empty(),
        attachments: files.iter().map(attachments::encode).collect(),
    })
}

/// Temporary id that cannot collide with server ids.
pub fn temp_id(now: DateTime<Utc>, seq: u64) -> RecordId {
    RecordId(format!("{}{}-{}", TEMP_ID_PREFIX, now.timestamp_millis(), seq))
}

/// Local copy of an outgoing message, shown before the server confirms it.
pub fn optimistic_message(
    id: RecordId,
    operator: &Operator,
    outgoing: &OutgoingMessage,
    now: DateTime<Utc>,
) -> Message {
    Message {
        id,
        sender_id: RecordId(operator.id.clone()),
        sender_name: operator.name.clone(),
        sender_role: operator.role,
        content: outgoing.content.clone(),
        text_content: Some(outgoing.text_content.clone()),
        attachments: outgoing.attachments.clone(),
        has_attachments: outgoing.has_attachments,
        timestamp: now.to_rfc3339(),
        delivery: Delivery::Sending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn operator() -> Operator {
        Operator {
            id: "1".into(),
            name: "Maria".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_empty_draft_is_noop() {
        assert!(build_outgoing("   \n", &[]).is_none());
        assert!(!Draft::text("  ").is_sendable());
    }

    #[test]
    fn test_text_only() {
        let out = build_outgoing("  Welcome!  ", &[]).unwrap();
        assert_eq!(out.content, "Welcome!");
        assert_eq!(out.text_content, "Welcome!");
        assert!(!out.has_attachments);
    }

    #[test]
    fn test_attachment_only_uses_placeholder() {
        let image = SelectedFile::new("plating.png", "image/png", vec![7u8; 2 * 1024 * 1024]);
        let out = build_outgoing("", &[image]).unwrap();
        assert!(out.has_attachments);
        assert_eq!(out.text_content, "");
        assert_eq!(out.content, ATTACHMENT_PLACEHOLDER);
        assert_eq!(out.attachments.len(), 1);
        assert_eq!(out.attachments[0].size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_optimistic_copy_carries_operator() {
        let now = Utc::now();
        let out = build_outgoing("hi", &[]).unwrap();
        let id = temp_id(now, 3);
        assert!(id.as_str().starts_with(TEMP_ID_PREFIX));
        assert!(id.as_str().ends_with("-3"));

        let m = optimistic_message(id, &operator(), &out, now);
        assert_eq!(m.sender_name, "Maria");
        assert_eq!(m.delivery, Delivery::Sending);
        assert_eq!(m.text(), "hi");
    }
}
