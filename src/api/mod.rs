//! API client module for the portal chat backend

mod chat;
pub mod client;
mod people;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::models::{ConversationRecord, Employee, Group, Message, Operator, OutgoingMessage, Role};
use client::PortalClient;

/// Backend operations the messaging core consumes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_conversations(
        &self,
        participant_id: &str,
        is_admin: bool,
    ) -> Result<Vec<ConversationRecord>>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    async fn send_group_message(
        &self,
        conversation_id: &str,
        sender: &Operator,
        payload: &OutgoingMessage,
    ) -> Result<()>;

    async fn send_private_message(
        &self,
        sender: &Operator,
        recipient_id: &str,
        payload: &OutgoingMessage,
    ) -> Result<()>;

    async fn mark_read(
        &self,
        conversation_id: &str,
        role: Role,
        is_group: bool,
        force: bool,
    ) -> Result<()>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn create_group(&self, name: &str, creator_id: &str, member_ids: &[String])
        -> Result<Group>;

    async fn list_employees(&self) -> Result<Vec<Employee>>;
}

/// `ChatBackend` over the portal REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: PortalClient,
}

impl HttpBackend {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }

    /// Load config and build a shared backend.
    pub fn from_config(config: &Config) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(PortalClient::new(config)?)))
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_conversations(
        &self,
        participant_id: &str,
        is_admin: bool,
    ) -> Result<Vec<ConversationRecord>> {
        chat::list_conversations(&self.client, participant_id, is_admin).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        chat::list_messages(&self.client, conversation_id).await
    }

    async fn send_group_message(
        &self,
        conversation_id: &str,
        sender: &Operator,
        payload: &OutgoingMessage,
    ) -> Result<()> {
        chat::send_group_message(&self.client, conversation_id, sender, payload).await
    }

    async fn send_private_message(
        &self,
        sender: &Operator,
        recipient_id: &str,
        payload: &OutgoingMessage,
    ) -> Result<()> {
        chat::send_private_message(&self.client, sender, recipient_id, payload).await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        role: Role,
        is_group: bool,
        force: bool,
    ) -> Result<()> {
        chat::mark_read(&self.client, conversation_id, role, is_group, force).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        people::list_groups(&self.client).await
    }

    async fn create_group(
        &self,
        name: &str,
        creator_id: &str,
        member_ids: &[String],
    ) -> Result<Group> {
        people::create_group(&self.client, name, creator_id, member_ids).await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        people::list_employees(&self.client).await
    }
}

/// Decode a list response that is either a bare array or wrapped under
/// `key` or `data`.
async fn parse_list<T: DeserializeOwned>(resp: reqwest::Response, key: &str) -> Result<Vec<T>> {
    let body: serde_json::Value = resp
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", key))?;
    list_from_value(body, key)
}

fn list_from_value<T: DeserializeOwned>(body: serde_json::Value, key: &str) -> Result<Vec<T>> {
    let items = match body {
        items @ serde_json::Value::Array(_) => items,
        serde_json::Value::Object(mut map) => match map.remove(key).or_else(|| map.remove("data")) {
            Some(v) if !v.is_null() => v,
            _ => return Ok(Vec::new()),
        },
        serde_json::Value::Null => return Ok(Vec::new()),
        other => anyhow::bail!("Unexpected {} response shape: {}", key, other),
    };
    serde_json::from_value(items).with_context(|| format!("Malformed {} list", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_from_value_shapes() {
        let bare: Vec<Group> = list_from_value(json!([{"id": 1, "name": "A"}]), "groups").unwrap();
        assert_eq!(bare.len(), 1);

        let wrapped: Vec<Group> =
            list_from_value(json!({"groups": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]}), "groups")
                .unwrap();
        assert_eq!(wrapped.len(), 2);

        let data: Vec<Group> = list_from_value(json!({"data": []}), "groups").unwrap();
        assert!(data.is_empty());

        let missing: Vec<Group> = list_from_value(json!({"other": 1}), "groups").unwrap();
        assert!(missing.is_empty());

        assert!(list_from_value::<Group>(json!("nope"), "groups").is_err());
    }
}
