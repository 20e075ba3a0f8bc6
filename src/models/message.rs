//! Message-related models

use serde::{Deserialize, Serialize};

use super::{RecordId, Role};

/// File attached to a message. `data` is a self-contained data URL, never a
/// reference to remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub size: u64,
    pub data: String,
}

/// Local delivery state of a message. Server-fetched messages are always `Confirmed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    #[default]
    Confirmed,
    /// Optimistic copy, send request in flight.
    Sending,
    /// Send accepted; waiting for the next foreground sync to supersede it.
    Sent,
    /// Send request failed.
    Failed,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: RecordId,
    #[serde(default)]
    pub sender_id: RecordId,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub has_attachments: bool,
    #[serde(default, alias = "createdAt")]
    pub timestamp: String,
    #[serde(skip)]
    pub delivery: Delivery,
}

impl Message {
    /// The user-authored text, falling back to the rendered content for
    /// backends that do not split the two.
    pub fn text(&self) -> &str {
        self.text_content.as_deref().unwrap_or(&self.content)
    }

    pub fn is_optimistic(&self) -> bool {
        self.delivery != Delivery::Confirmed
    }
}

/// Payload of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub content: String,
    pub text_content: String,
    pub has_attachments: bool,
    pub attachments: Vec<Attachment>,
}
