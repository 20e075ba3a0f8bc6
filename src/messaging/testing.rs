//! In-memory `ChatBackend` for tests. Records every call and materializes
//! private conversations on first send, like the portal does.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::directory;
use crate::api::ChatBackend;
use crate::models::{
    ConversationKind, ConversationRecord, Employee, Group, LastMessage, Message, Operator,
    OutgoingMessage, RecordId, Role,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListConversations,
    ListMessages(String),
    SendGroup(String),
    SendPrivate(String),
    MarkRead {
        conversation_id: String,
        is_group: bool,
        force: bool,
    },
    ListGroups,
    CreateGroup(String),
    ListEmployees,
}

#[derive(Default)]
pub struct State {
    pub employees: Vec<Employee>,
    pub conversations: Vec<ConversationRecord>,
    pub groups: Vec<Group>,
    pub messages: HashMap<String, Vec<Message>>,
    pub calls: Vec<Call>,
    pub fail_sends: bool,
    pub fail_messages: bool,
    /// Latency for successive message fetches. The reply is captured before
    /// the delay, so a slow fetch returns what the backend held when it began.
    pub message_delays: VecDeque<Duration>,
    next_id: u64,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append a message as if `sender` had sent it through another client.
    pub fn push_message(&mut self, conversation_id: &str, sender_id: &str, role: Role, text: &str) {
        let n = self.next();
        let message = Message {
            id: RecordId(format!("m{}", n)),
            sender_id: sender_id.into(),
            sender_name: format!("User {}", sender_id),
            sender_role: role,
            content: text.to_string(),
            text_content: Some(text.to_string()),
            attachments: Vec::new(),
            has_attachments: false,
            timestamp: format!("2024-06-01T12:{:02}:{:02}Z", n / 60 % 60, n % 60),
            delivery: Default::default(),
        };
        if let Some(rec) = self
            .conversations
            .iter_mut()
            .find(|c| c.id.as_str() == conversation_id)
        {
            rec.last_message = Some(LastMessage {
                content: Some(message.content.clone()),
                timestamp: Some(message.timestamp.clone()),
                sender_name: Some(message.sender_name.clone()),
            });
        }
        self.messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }

    fn push_outgoing(&mut self, conversation_id: &str, sender: &Operator, payload: &OutgoingMessage) {
        self.push_message(conversation_id, &sender.id, sender.role, &payload.content);
        if let Some(m) = self
            .messages
            .get_mut(conversation_id)
            .and_then(|v| v.last_mut())
        {
            m.sender_name = sender.name.clone();
            m.text_content = Some(payload.text_content.clone());
            m.attachments = payload.attachments.clone();
            m.has_attachments = payload.has_attachments;
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }
}

#[async_trait]
impl ChatBackend for MemoryBackend {
    async fn list_conversations(&self, _: &str, _: bool) -> Result<Vec<ConversationRecord>> {
        let mut s = self.state();
        s.calls.push(Call::ListConversations);
        Ok(s.conversations.clone())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let (delay, result) = {
            let mut s = self.state();
            s.calls.push(Call::ListMessages(conversation_id.to_string()));
            let result = if s.fail_messages {
                Err(anyhow!("HTTP 503 for messages"))
            } else {
                Ok(s.messages.get(conversation_id).cloned().unwrap_or_default())
            };
            (s.message_delays.pop_front(), result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn send_group_message(
        &self,
        conversation_id: &str,
        sender: &Operator,
        payload: &OutgoingMessage,
    ) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::SendGroup(conversation_id.to_string()));
        if s.fail_sends {
            bail!("HTTP 500 for send");
        }
        s.push_outgoing(conversation_id, sender, payload);
        Ok(())
    }

    async fn send_private_message(
        &self,
        sender: &Operator,
        recipient_id: &str,
        payload: &OutgoingMessage,
    ) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::SendPrivate(recipient_id.to_string()));
        if s.fail_sends {
            bail!("HTTP 500 for send");
        }
        let existing = directory::find_private(&s.conversations, recipient_id).map(|r| r.id.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = RecordId(format!("c{}", s.next()));
                s.conversations.push(ConversationRecord {
                    id: id.clone(),
                    kind: ConversationKind::Private,
                    participant_ids: Some(vec![
                        RecordId(sender.id.clone()),
                        RecordId(recipient_id.to_string()),
                    ]),
                    ..Default::default()
                });
                id
            }
        };
        s.push_outgoing(id.as_str(), sender, payload);
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &str, _: Role, is_group: bool, force: bool) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::MarkRead {
            conversation_id: conversation_id.to_string(),
            is_group,
            force,
        });
        if let Some(rec) = s
            .conversations
            .iter_mut()
            .find(|c| c.id.as_str() == conversation_id)
        {
            rec.unread_count = 0;
        }
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let mut s = self.state();
        s.calls.push(Call::ListGroups);
        Ok(s.groups.clone())
    }

    async fn create_group(&self, name: &str, creator_id: &str, member_ids: &[String]) -> Result<Group> {
        let mut s = self.state();
        s.calls.push(Call::CreateGroup(name.to_string()));
        if name.trim().is_empty() {
            bail!("HTTP 400: group name required");
        }
        let group = Group {
            id: RecordId(format!("g{}", s.next())),
            name: name.to_string(),
            creator_id: Some(creator_id.into()),
            member_ids: member_ids.iter().map(|m| RecordId(m.clone())).collect(),
        };
        s.groups.push(group.clone());
        Ok(group)
    }

    async fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut s = self.state();
        s.calls.push(Call::ListEmployees);
        Ok(s.employees.clone())
    }
}
