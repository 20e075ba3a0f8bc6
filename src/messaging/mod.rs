//! Admin/employee messaging core.
//!
//! Directory merging, virtual-conversation resolution, polling sync,
//! read-state confirmation and optimistic sending. All state lives in
//! [`Messenger`]; backend calls and timers run as tokio tasks that report
//! back through [`MessengerEvent`]s, which the host feeds to
//! [`Messenger::handle`].

pub mod attachments;
pub mod composer;
pub mod directory;
mod messenger;
pub mod read_state;
pub mod resolver;
pub mod session;
pub mod sync;

#[cfg(test)]
pub mod testing;

use anyhow::{Context, Result};

use crate::api::ChatBackend;
use crate::models::{
    Conversation, ConversationRecord, Employee, Group, Message, Operator, OutgoingMessage,
    RecordId,
};
pub use messenger::{Messenger, Notice, Update};
use session::SessionId;
use sync::SyncMode;

/// Completions and ticks delivered to the messenger.
pub enum MessengerEvent {
    EmployeesLoaded(Result<Vec<Employee>>),
    ConversationsLoaded(Result<Vec<ConversationRecord>>),
    GroupsLoaded(Result<Vec<Group>>),
    SyncTick(SessionId),
    ReadTick(SessionId),
    MessagesFetched {
        session: SessionId,
        conversation_id: String,
        /// Per-session fetch sequence; older completions are dropped.
        seq: u64,
        mode: SyncMode,
        result: Result<Vec<Message>>,
    },
    MessageSent {
        session: SessionId,
        temp_id: RecordId,
        result: Result<()>,
    },
    MarkedRead {
        session: SessionId,
        result: Result<()>,
    },
    GroupCreated(Result<Group>),
    SearchSettled {
        generation: u64,
    },
}

/// Dispatch a payload to the right send endpoint for the conversation.
pub async fn deliver<B: ChatBackend + ?Sized>(
    backend: &B,
    sender: &Operator,
    conversation: &Conversation,
    payload: &OutgoingMessage,
) -> Result<()> {
    if conversation.is_group() {
        let id = conversation
            .id
            .persisted()
            .context("Group conversation has no backend id")?;
        backend.send_group_message(id, sender, payload).await
    } else {
        let recipient = conversation
            .participant_ref
            .as_deref()
            .context("Conversation has no recipient")?;
        backend
            .send_private_message(sender, recipient, payload)
            .await
    }
}
