//! Message synchronization: dedup, tail-only change detection, and the
//! displayed list (last synced server list plus an overlay of pending sends).

use std::collections::HashSet;

use crate::models::{Delivery, Message, RecordId, Role};

/// How a fetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Conversation just opened or a send just completed: show loading,
    /// update unconditionally.
    Foreground,
    /// Periodic poll: no loading UI, update only on change.
    Silent,
}

/// Drop any message whose id already appeared earlier, keeping first occurrences in order.
pub fn dedup_by_id(messages: Vec<Message>) -> Vec<Message> {
    let mut seen: HashSet<RecordId> = HashSet::with_capacity(messages.len());
    messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

/// Whether `next` differs from `prev`. Only lengths and the tail are compared.
pub fn has_changed(prev: &[Message], next: &[Message]) -> bool {
    if prev.len() != next.len() {
        return true;
    }
    match (prev.last(), next.last()) {
        (Some(a), Some(b)) => a.id != b.id || a.timestamp != b.timestamp,
        _ => false,
    }
}

/// What applying a fetch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Displayed list changed.
    pub changed: bool,
    /// New content arrived whose newest message is from someone else.
    pub incoming: bool,
}

/// Messages displayed for the open conversation.
#[derive(Debug, Default)]
pub struct MessageList {
    synced: Vec<Message>,
    pending: Vec<Message>,
    loading: bool,
    /// Sequence of the most recently issued fetch.
    issued: u64,
    /// Sequence of the newest fetch whose result was applied.
    applied: u64,
    /// Foreground fetch the loading flag waits for.
    loading_for: u64,
}

impl MessageList {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Issue a sequence number for a fetch about to be spawned. Foreground
    /// fetches raise the loading flag until a result at least this new lands.
    pub fn begin_fetch(&mut self, mode: SyncMode) -> u64 {
        self.issued += 1;
        if mode == SyncMode::Foreground {
            self.loading = true;
            self.loading_for = self.issued;
        }
        self.issued
    }

    /// Apply the result of fetch `seq`. Completions older than one already
    /// applied are dropped, so a slow poll cannot roll the list back.
    pub fn apply_fetch(
        &mut self,
        seq: u64,
        mode: SyncMode,
        result: anyhow::Result<Vec<Message>>,
        own_role: Role,
    ) -> SyncOutcome {
        if seq <= self.applied {
            tracing::debug!("Dropping fetch {} (already applied {})", seq, self.applied);
            return SyncOutcome::default();
        }
        let ok = result.is_ok();
        if !ok && mode == SyncMode::Silent {
            return self.apply(mode, result, own_role);
        }
        self.applied = seq;
        let mut outcome = self.apply(mode, result, own_role);
        if ok && self.loading && seq >= self.loading_for {
            self.loading = false;
            outcome.changed = true;
        }
        outcome
    }

    /// Server list followed by pending sends not yet present in it.
    pub fn visible(&self) -> Vec<&Message> {
        let synced_ids: HashSet<&RecordId> = self.synced.iter().map(|m| &m.id).collect();
        self.synced
            .iter()
            .chain(self.pending.iter().filter(|m| !synced_ids.contains(&m.id)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.visible().len()
    }

    pub fn is_empty(&self) -> bool {
        self.synced.is_empty() && self.pending.is_empty()
    }

    /// Append an optimistic message.
    pub fn push_pending(&mut self, message: Message) {
        self.pending.push(message);
    }

    /// Update the delivery state of a pending message. Returns false if unknown.
    pub fn set_delivery(&mut self, id: &RecordId, delivery: Delivery) -> bool {
        match self.pending.iter_mut().find(|m| &m.id == id) {
            Some(m) => {
                m.delivery = delivery;
                true
            }
            None => false,
        }
    }

    /// Apply a fetch result.
    ///
    /// Foreground: the synced list is replaced wholesale and accepted sends are
    /// dropped from the overlay; a failure empties the list. Silent: the list
    /// is replaced only on change; a failure keeps the stale list.
    pub fn apply(
        &mut self,
        mode: SyncMode,
        result: anyhow::Result<Vec<Message>>,
        own_role: Role,
    ) -> SyncOutcome {
        let fetched = match result {
            Ok(messages) => dedup_by_id(messages),
            Err(e) => {
                return match mode {
                    SyncMode::Foreground => {
                        tracing::warn!("Failed to load messages: {:#}", e);
                        let changed = self.loading || !self.synced.is_empty();
                        self.synced.clear();
                        self.loading = false;
                        SyncOutcome {
                            changed,
                            incoming: false,
                        }
                    }
                    SyncMode::Silent => {
                        tracing::debug!("Background sync failed, retrying next tick: {:#}", e);
                        SyncOutcome::default()
                    }
                };
            }
        };

        let changed = has_changed(&self.synced, &fetched);
        match mode {
            SyncMode::Foreground => {
                let had_accepted = self.pending.iter().any(|m| m.delivery == Delivery::Sent);
                self.pending.retain(|m| m.delivery != Delivery::Sent);
                let was_loading = self.loading;
                self.synced = fetched;
                self.loading = false;
                SyncOutcome {
                    changed: changed || had_accepted || was_loading,
                    incoming: false,
                }
            }
            SyncMode::Silent => {
                if !changed {
                    return SyncOutcome::default();
                }
                self.synced = fetched;
                let incoming = self
                    .synced
                    .last()
                    .map_or(false, |m| m.sender_role != own_role);
                SyncOutcome {
                    changed: true,
                    incoming,
                }
            }
        }
    }
}
