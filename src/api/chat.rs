//! Conversation and message endpoints of the portal chat API

use anyhow::Result;
use serde_json::json;

use super::client::{encode, PortalClient};
use crate::models::{ConversationRecord, Message, Operator, OutgoingMessage, Role};

pub async fn list_conversations(
    client: &PortalClient,
    participant_id: &str,
    is_admin: bool,
) -> Result<Vec<ConversationRecord>> {
    let path = format!(
        "/api/chat/conversations?participantId={}&isAdmin={}",
        encode(participant_id),
        is_admin
    );
    let resp = client.get(&path).await?;
    super::parse_list(resp, "conversations").await
}

pub async fn list_messages(client: &PortalClient, conversation_id: &str) -> Result<Vec<Message>> {
    let path = format!(
        "/api/chat/conversations/{}/messages",
        encode(conversation_id)
    );
    let resp = client.get(&path).await?;
    super::parse_list(resp, "messages").await
}

/// Common sender + payload fields of both send endpoints.
fn message_body(sender: &Operator, payload: &OutgoingMessage) -> serde_json::Value {
    json!({
        "senderId": sender.id,
        "senderName": sender.name,
        "senderRole": sender.role.as_str(),
        "content": payload.content,
        "textContent": payload.text_content,
        "hasAttachments": payload.has_attachments,
        "attachments": payload.attachments,
    })
}

pub async fn send_group_message(
    client: &PortalClient,
    conversation_id: &str,
    sender: &Operator,
    payload: &OutgoingMessage,
) -> Result<()> {
    let path = format!(
        "/api/chat/conversations/{}/messages",
        encode(conversation_id)
    );
    client.post(&path, &message_body(sender, payload)).await?;
    Ok(())
}

pub async fn send_private_message(
    client: &PortalClient,
    sender: &Operator,
    recipient_id: &str,
    payload: &OutgoingMessage,
) -> Result<()> {
    let mut body = message_body(sender, payload);
    body["recipientId"] = json!(recipient_id);
    client.post("/api/chat/private-messages", &body).await?;
    Ok(())
}

pub async fn mark_read(
    client: &PortalClient,
    conversation_id: &str,
    role: Role,
    is_group: bool,
    force: bool,
) -> Result<()> {
    let path = format!("/api/chat/conversations/{}/read", encode(conversation_id));
    let body = json!({
        "role": role.as_str(),
        "isGroup": is_group,
        "force": force,
    });
    client.put(&path, &body).await?;
    Ok(())
}
