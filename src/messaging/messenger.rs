use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;

use super::attachments;
use super::composer::{self, Draft};
use super::directory::{self, Directory};
use super::read_state::ReadTracker;
use super::resolver;
use super::session::{SessionId, SessionTimers};
use super::sync::{MessageList, SyncMode};
use super::{deliver, MessengerEvent};
use crate::api::ChatBackend;
use crate::config::Timing;
use crate::models::{Conversation, ConversationId, Delivery, Employee, Message, Operator};

/// Something the host must show the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Blocking problem: rejected attachment, failed send, failed group creation.
    Alert(String),
    Info(String),
}

/// What handling an event or action changed, so the host knows whether to redraw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Update {
    pub changed: bool,
    /// The message view should scroll to the newest message.
    pub scroll_to_latest: bool,
}

impl Update {
    fn changed() -> Self {
        Self {
            changed: true,
            scroll_to_latest: false,
        }
    }

    pub fn merge(&mut self, other: Update) {
        self.changed |= other.changed;
        self.scroll_to_latest |= other.scroll_to_latest;
    }
}

/// The open conversation with its messages, read state and timers.
struct Session {
    id: SessionId,
    conversation: Conversation,
    messages: MessageList,
    read: ReadTracker,
    timers: SessionTimers,
}

/// Owner of all messaging state.
///
/// Backend calls run on spawned tasks and report back as [`MessengerEvent`]s;
/// the host pulls them with [`Messenger::next_event`] and passes them to
/// [`Messenger::handle`], which is the only place state changes in response
/// to I/O. Completions belonging to a closed session are dropped.
pub struct Messenger<B: ChatBackend + 'static> {
    backend: Arc<B>,
    operator: Operator,
    timing: Timing,
    events_tx: mpsc::UnboundedSender<MessengerEvent>,
    events_rx: mpsc::UnboundedReceiver<MessengerEvent>,
    directory: Directory,
    session: Option<Session>,
    next_session: u64,
    next_temp: u64,
    notices: VecDeque<Notice>,
}

impl<B: ChatBackend + 'static> Messenger<B> {
    pub fn new(backend: Arc<B>, operator: Operator, timing: Timing) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            operator,
            timing,
            events_tx,
            events_rx,
            directory: Directory::default(),
            session: None,
            next_session: 0,
            next_temp: 0,
            notices: VecDeque::new(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    // ---- Directory -------------------------------------------------------

    /// Fetch roster, conversations and groups in the background.
    pub fn load_directory(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.list_employees().await;
            let _ = tx.send(MessengerEvent::EmployeesLoaded(result));
        });
        self.refresh_conversations();
        self.refresh_groups();
    }

    /// Re-fetch the conversation list. Also drives virtual-conversation resolution.
    pub fn refresh_conversations(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let participant = self.operator.id.clone();
        let is_admin = self.operator.role.is_admin();
        tokio::spawn(async move {
            let result = backend.list_conversations(&participant, is_admin).await;
            let _ = tx.send(MessengerEvent::ConversationsLoaded(result));
        });
    }

    pub fn refresh_groups(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.list_groups().await;
            let _ = tx.send(MessengerEvent::GroupsLoaded(result));
        });
    }

    /// Load the directory and wait for it. Errors propagate, for one-shot commands.
    pub async fn load_directory_now(&mut self) -> Result<()> {
        let (employees, records, groups) = tokio::try_join!(
            self.backend.list_employees(),
            self.backend
                .list_conversations(&self.operator.id, self.operator.role.is_admin()),
            self.backend.list_groups(),
        )?;
        self.apply_roster(employees);
        self.directory.set_records(records);
        self.directory.set_groups(groups);
        Ok(())
    }

    fn apply_roster(&mut self, employees: Vec<Employee>) {
        let total = employees.len();
        let roster: Vec<Employee> = employees
            .into_iter()
            .filter(|e| e.is_messageable() && e.id.as_str() != self.operator.id)
            .collect();
        tracing::debug!("Roster: {} of {} employees messageable", roster.len(), total);
        self.directory.set_roster(roster);
    }

    pub fn employee_conversations(&self) -> Vec<&Conversation> {
        self.directory.employee_conversations()
    }

    pub fn group_conversations(&self) -> Vec<&Conversation> {
        self.directory.group_conversations()
    }

    pub fn combined_conversations(&self) -> Vec<&Conversation> {
        self.directory.combined()
    }

    /// Record a search keystroke. The filter applies once input is quiet for
    /// the debounce interval.
    pub fn set_search(&mut self, term: String) {
        let generation = self.directory.submit_search(term);
        let quiet = tokio::time::sleep(self.timing.search_debounce());
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            quiet.await;
            let _ = tx.send(MessengerEvent::SearchSettled { generation });
        });
    }

    /// Apply a search term without debouncing.
    pub fn set_search_now(&mut self, term: String) {
        let generation = self.directory.submit_search(term);
        self.directory.settle_search(generation);
    }

    pub fn set_unread_only(&mut self, unread_only: bool) {
        self.directory.set_unread_only(unread_only);
    }

    pub fn create_group(&self, name: String, member_ids: Vec<String>) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let creator = self.operator.id.clone();
        tokio::spawn(async move {
            let result = backend.create_group(&name, &creator, &member_ids).await;
            let _ = tx.send(MessengerEvent::GroupCreated(result));
        });
    }

    // ---- Open conversation -----------------------------------------------

    /// Open a conversation, closing any previous one. Virtual conversations
    /// are resolved against the known records first.
    pub fn select_conversation(&mut self, conversation: Conversation) -> Update {
        self.close_session();

        let conversation = resolver::resolve(conversation, self.directory.records());
        self.next_session += 1;
        let id = SessionId(self.next_session);
        let mut session = Session {
            id,
            timers: SessionTimers::start(id, &self.timing, self.events_tx.clone()),
            conversation,
            messages: MessageList::default(),
            read: ReadTracker::default(),
        };
        tracing::info!(
            "Opened {} ({}) as session {}",
            session.conversation.display_name,
            session.conversation.id,
            id
        );

        let unread = session.conversation.unread_count;
        let force_read = session.read.on_open(unread);
        if let Some(cid) = session.conversation.id.persisted() {
            let seq = session.messages.begin_fetch(SyncMode::Foreground);
            spawn_fetch(&self.backend, &self.events_tx, id, cid.to_string(), seq, SyncMode::Foreground);
            if force_read {
                spawn_mark_read(&self.backend, &self.events_tx, &self.operator, &session, true);
            }
        } else if force_read {
            // Nothing persisted to mark.
            session.read.on_marked(true);
        }

        self.session = Some(session);
        Update {
            changed: true,
            scroll_to_latest: true,
        }
    }

    /// Find a conversation by persisted or virtual id. Virtual ids come back
    /// resolved when the backend already has the conversation.
    pub fn lookup(&self, id: &ConversationId) -> Option<Conversation> {
        let records = self.directory.records();
        if let Some(found) = self.directory.find(id) {
            return Some(resolver::resolve(found.clone(), records));
        }
        match id {
            ConversationId::Virtual(pid) => directory::find_private(records, pid)
                .map(|r| Conversation::from_record(r, None, Some(pid.clone()))),
            ConversationId::Persisted(cid) => records
                .iter()
                .find(|r| r.id.as_str() == cid)
                .map(|r| {
                    let counterpart = directory::counterpart(r, &self.operator.id);
                    Conversation::from_record(r, None, counterpart)
                }),
        }
    }

    /// Close the open conversation and stop its timers.
    pub fn back_to_list(&mut self) {
        self.close_session();
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.timers.stop();
            tracing::debug!("Closed session {}", session.id);
        }
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.session.as_ref().map(|s| &s.conversation)
    }

    pub fn messages(&self) -> Vec<&Message> {
        self.session
            .as_ref()
            .map(|s| s.messages.visible())
            .unwrap_or_default()
    }

    pub fn message_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.messages.len())
    }

    pub fn is_loading(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.messages.is_loading())
    }

    pub fn has_unread(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.read.has_unread())
    }

    /// Send a draft in the open conversation.
    ///
    /// Oversized attachments are reported as alerts and left out. The message
    /// shows up at once with a temporary id and is replaced by the server copy
    /// on the next foreground sync.
    pub fn send_message(&mut self, draft: Draft) -> Update {
        let Some(session) = self.session.as_mut() else {
            self.notices
                .push_back(Notice::Alert("No conversation selected".to_string()));
            return Update::default();
        };

        let accepted = attachments::accept(draft.files);
        for err in accepted.oversized {
            self.notices.push_back(Notice::Alert(err.to_string()));
        }
        let Some(outgoing) = composer::build_outgoing(&draft.text, &accepted.files) else {
            return Update::default();
        };

        self.next_temp += 1;
        let now = Utc::now();
        let temp_id = composer::temp_id(now, self.next_temp);
        session.messages.push_pending(composer::optimistic_message(
            temp_id.clone(),
            &self.operator,
            &outgoing,
            now,
        ));
        tracing::info!(
            "Sending {} to {} ({} attachment(s))",
            temp_id,
            session.conversation.id,
            outgoing.attachments.len()
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let operator = self.operator.clone();
        let conversation = session.conversation.clone();
        let session_id = session.id;
        tokio::spawn(async move {
            let result = deliver(backend.as_ref(), &operator, &conversation, &outgoing).await;
            let _ = tx.send(MessengerEvent::MessageSent {
                session: session_id,
                temp_id,
                result,
            });
        });

        Update {
            changed: true,
            scroll_to_latest: true,
        }
    }

    // ---- Events ----------------------------------------------------------

    /// Wait for the next completion or tick.
    pub async fn next_event(&mut self) -> Option<MessengerEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<MessengerEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Alerts and infos raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Apply a completion or tick.
    pub fn handle(&mut self, event: MessengerEvent) -> Update {
        match event {
            MessengerEvent::EmployeesLoaded(Ok(employees)) => {
                self.apply_roster(employees);
                Update::changed()
            }
            MessengerEvent::ConversationsLoaded(Ok(records)) => {
                tracing::debug!("Loaded {} conversations", records.len());
                self.directory.set_records(records);
                let mut update = Update::changed();
                update.merge(self.resolve_session());
                update
            }
            MessengerEvent::GroupsLoaded(Ok(groups)) => {
                self.directory.set_groups(groups);
                Update::changed()
            }
            MessengerEvent::EmployeesLoaded(Err(e))
            | MessengerEvent::ConversationsLoaded(Err(e))
            | MessengerEvent::GroupsLoaded(Err(e)) => {
                tracing::warn!("Directory refresh failed: {:#}", e);
                Update::default()
            }
            MessengerEvent::SyncTick(session) => {
                if let Some(s) = self.session.as_mut().filter(|s| s.id == session) {
                    if let Some(cid) = s.conversation.id.persisted() {
                        let cid = cid.to_string();
                        let seq = s.messages.begin_fetch(SyncMode::Silent);
                        spawn_fetch(&self.backend, &self.events_tx, s.id, cid, seq, SyncMode::Silent);
                    }
                }
                Update::default()
            }
            MessengerEvent::ReadTick(session) => {
                if let Some(s) = self.session.as_mut().filter(|s| s.id == session) {
                    if s.conversation.id.persisted().is_some() && s.read.on_tick() {
                        spawn_mark_read(&self.backend, &self.events_tx, &self.operator, s, false);
                    }
                }
                Update::default()
            }
            MessengerEvent::MessagesFetched {
                session,
                conversation_id,
                seq,
                mode,
                result,
            } => {
                let Some(s) = self.session.as_mut().filter(|s| {
                    s.id == session && s.conversation.id.persisted() == Some(conversation_id.as_str())
                }) else {
                    tracing::debug!("Discarding stale fetch for {}", conversation_id);
                    return Update::default();
                };
                let outcome = s.messages.apply_fetch(seq, mode, result, self.operator.role);
                if outcome.incoming {
                    s.read.mark_unread();
                }
                Update {
                    changed: outcome.changed,
                    scroll_to_latest: outcome.incoming
                        || (mode == SyncMode::Foreground && outcome.changed),
                }
            }
            MessengerEvent::MessageSent {
                session,
                temp_id,
                result,
            } => self.on_sent(session, temp_id, result),
            MessengerEvent::MarkedRead { session, result } => {
                let ok = result.is_ok();
                if let Err(e) = result {
                    tracing::debug!("Mark-read failed, retrying next tick: {:#}", e);
                }
                match self.session.as_mut().filter(|s| s.id == session) {
                    Some(s) => {
                        s.read.on_marked(ok);
                        if ok {
                            self.refresh_conversations();
                        }
                        Update::changed()
                    }
                    None => Update::default(),
                }
            }
            MessengerEvent::GroupCreated(Ok(group)) => {
                tracing::info!("Created group {} ({})", group.name, group.id);
                self.notices
                    .push_back(Notice::Info(format!("Created group '{}'", group.name)));
                self.refresh_groups();
                self.refresh_conversations();
                Update::changed()
            }
            MessengerEvent::GroupCreated(Err(e)) => {
                tracing::warn!("Group creation failed: {:#}", e);
                self.notices
                    .push_back(Notice::Alert(format!("Failed to create group: {:#}", e)));
                Update::changed()
            }
            MessengerEvent::SearchSettled { generation } => Update {
                changed: self.directory.settle_search(generation),
                scroll_to_latest: false,
            },
        }
    }

    fn on_sent(
        &mut self,
        session: SessionId,
        temp_id: crate::models::RecordId,
        result: Result<()>,
    ) -> Update {
        let ok = result.is_ok();
        if let Err(e) = result {
            tracing::warn!("Send {} failed: {:#}", temp_id, e);
            self.notices
                .push_back(Notice::Alert(format!("Failed to send message: {:#}", e)));
        }
        // The conversation list carries last-message summaries, and a first
        // private send creates the conversation we need to resolve to.
        self.refresh_conversations();

        let Some(s) = self.session.as_mut().filter(|s| s.id == session) else {
            return Update::default();
        };
        let delivery = if ok { Delivery::Sent } else { Delivery::Failed };
        s.messages.set_delivery(&temp_id, delivery);
        if ok {
            if let Some(cid) = s.conversation.id.persisted() {
                let cid = cid.to_string();
                let seq = s.messages.begin_fetch(SyncMode::Foreground);
                spawn_fetch(&self.backend, &self.events_tx, s.id, cid, seq, SyncMode::Foreground);
            }
        }
        Update::changed()
    }

    /// Swap a virtual open conversation for its persisted counterpart once the
    /// records contain it, then reload its messages.
    fn resolve_session(&mut self) -> Update {
        let Some(s) = self.session.as_mut() else {
            return Update::default();
        };
        let Some(resolved) = resolver::try_resolve(&s.conversation, self.directory.records()) else {
            return Update::default();
        };
        tracing::info!("Resolved {} to {}", s.conversation.id, resolved.id);
        s.conversation = resolved;
        if let Some(cid) = s.conversation.id.persisted() {
            let cid = cid.to_string();
            let seq = s.messages.begin_fetch(SyncMode::Foreground);
            spawn_fetch(&self.backend, &self.events_tx, s.id, cid, seq, SyncMode::Foreground);
        }
        Update::changed()
    }
}

fn spawn_fetch<B: ChatBackend + 'static>(
    backend: &Arc<B>,
    tx: &mpsc::UnboundedSender<MessengerEvent>,
    session: SessionId,
    conversation_id: String,
    seq: u64,
    mode: SyncMode,
) {
    let backend = Arc::clone(backend);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = backend.list_messages(&conversation_id).await;
        let _ = tx.send(MessengerEvent::MessagesFetched {
            session,
            conversation_id,
            seq,
            mode,
            result,
        });
    });
}

fn spawn_mark_read<B: ChatBackend + 'static>(
    backend: &Arc<B>,
    tx: &mpsc::UnboundedSender<MessengerEvent>,
    operator: &Operator,
    session: &Session,
    force: bool,
) {
    let Some(cid) = session.conversation.id.persisted() else {
        return;
    };
    let backend = Arc::clone(backend);
    let tx = tx.clone();
    let conversation_id = cid.to_string();
    let role = operator.role;
    let is_group = session.conversation.is_group();
    let id = session.id;
    tokio::spawn(async move {
        let result = backend
            .mark_read(&conversation_id, role, is_group, force)
            .await;
        let _ = tx.send(MessengerEvent::MarkedRead {
            session: id,
            result,
        });
    });
}
