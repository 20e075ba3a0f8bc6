//! Conversation directory: merges the employee roster with persisted
//! conversations so every roster entry appears exactly once, either as its
//! persisted conversation or as a virtual placeholder.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{
    value_id, Conversation, ConversationId, ConversationKind, ConversationRecord, Employee, Group,
    RecordId,
};

/// One piece of membership evidence carried by a backend record.
#[derive(Debug, Clone, Copy)]
pub enum MembershipEvidence<'a> {
    /// `members`: ids or member objects.
    Members(&'a [serde_json::Value]),
    /// `participants`: map keyed by participant id.
    Participants(&'a serde_json::Map<String, serde_json::Value>),
    /// `participantIds`
    ParticipantIds(&'a [RecordId]),
    RecipientId(&'a RecordId),
    EmployeeId(&'a RecordId),
    UserId(&'a RecordId),
}

impl MembershipEvidence<'_> {
    pub fn contains(&self, participant_id: &str) -> bool {
        match self {
            MembershipEvidence::Members(members) => members
                .iter()
                .any(|m| value_id(m).as_deref() == Some(participant_id)),
            MembershipEvidence::Participants(map) => map.contains_key(participant_id),
            MembershipEvidence::ParticipantIds(ids) => {
                ids.iter().any(|id| id.as_str() == participant_id)
            }
            MembershipEvidence::RecipientId(id)
            | MembershipEvidence::EmployeeId(id)
            | MembershipEvidence::UserId(id) => id.as_str() == participant_id,
        }
    }

    /// All participant ids this evidence names.
    fn ids(&self) -> Vec<String> {
        match self {
            MembershipEvidence::Members(members) => members.iter().filter_map(value_id).collect(),
            MembershipEvidence::Participants(map) => map.keys().cloned().collect(),
            MembershipEvidence::ParticipantIds(ids) => ids.iter().map(|i| i.to_string()).collect(),
            MembershipEvidence::RecipientId(id)
            | MembershipEvidence::EmployeeId(id)
            | MembershipEvidence::UserId(id) => vec![id.to_string()],
        }
    }
}

/// Evidence present on a record, in matching priority order.
pub fn evidence(record: &ConversationRecord) -> Vec<MembershipEvidence<'_>> {
    let mut out = Vec::new();
    if let Some(ref m) = record.members {
        out.push(MembershipEvidence::Members(m));
    }
    if let Some(ref p) = record.participants {
        out.push(MembershipEvidence::Participants(p));
    }
    if let Some(ref ids) = record.participant_ids {
        out.push(MembershipEvidence::ParticipantIds(ids));
    }
    if let Some(ref id) = record.recipient_id {
        out.push(MembershipEvidence::RecipientId(id));
    }
    if let Some(ref id) = record.employee_id {
        out.push(MembershipEvidence::EmployeeId(id));
    }
    if let Some(ref id) = record.user_id {
        out.push(MembershipEvidence::UserId(id));
    }
    out
}

/// First private record whose membership evidence names `participant_id`.
pub fn find_private<'a>(
    records: &'a [ConversationRecord],
    participant_id: &str,
) -> Option<&'a ConversationRecord> {
    records
        .iter()
        .filter(|r| r.kind == ConversationKind::Private)
        .find(|r| evidence(r).iter().any(|e| e.contains(participant_id)))
}

/// Counterpart of a private record from `operator_id`'s point of view.
pub fn counterpart(record: &ConversationRecord, operator_id: &str) -> Option<String> {
    evidence(record)
        .iter()
        .flat_map(|e| e.ids())
        .find(|id| id != operator_id)
}

/// Merge roster and records: exactly one entry per roster member, in roster order.
pub fn merge(roster: &[Employee], records: &[ConversationRecord]) -> Vec<Conversation> {
    roster
        .iter()
        .map(|employee| match find_private(records, employee.id.as_str()) {
            Some(record) => Conversation::from_record(
                record,
                Some(employee.display_name()),
                Some(employee.id.to_string()),
            ),
            None => Conversation::placeholder(employee),
        })
        .collect()
}

/// Group conversations: group records, plus groups from the group list that
/// have no record yet.
pub fn group_conversations(records: &[ConversationRecord], groups: &[Group]) -> Vec<Conversation> {
    let mut out: Vec<Conversation> = records
        .iter()
        .filter(|r| r.kind == ConversationKind::Group)
        .map(|r| {
            let name = groups.iter().find(|g| g.id == r.id).map(|g| g.name.clone());
            Conversation::from_record(r, name, None)
        })
        .collect();
    let known: HashSet<ConversationId> = out.iter().map(|c| c.id.clone()).collect();
    for group in groups {
        let id = ConversationId::Persisted(group.id.to_string());
        if !known.contains(&id) {
            out.push(Conversation {
                id,
                kind: ConversationKind::Group,
                display_name: group.name.clone(),
                participant_ref: None,
                last_message: None,
                unread_count: 0,
            });
        }
    }
    out
}

/// Most recent activity first; conversations without messages last, by name.
pub fn by_recency(a: &Conversation, b: &Conversation) -> Ordering {
    match (a.last_activity(), b.last_activity()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
    }
}

/// List filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Case-insensitive substring of the display name.
    pub search: String,
    pub unread_only: bool,
}

impl DirectoryFilter {
    pub fn matches(&self, conversation: &Conversation) -> bool {
        if self.unread_only && conversation.unread_count == 0 {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || conversation.display_name.to_lowercase().contains(&needle)
    }
}

/// Latest-value-wins debounce bookkeeping. The caller schedules the wake-up;
/// only the most recent submission's generation settles.
#[derive(Debug, Default)]
pub struct Debounced<T> {
    pending: Option<T>,
    generation: u64,
}

impl<T> Debounced<T> {
    /// Record a new value, superseding any pending one. Returns its generation.
    pub fn submit(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.pending = Some(value);
        self.generation
    }

    /// Take the pending value if `generation` is still the latest submission.
    pub fn settle(&mut self, generation: u64) -> Option<T> {
        if generation == self.generation {
            self.pending.take()
        } else {
            None
        }
    }
}

/// Roster, records and groups, with the merged lists cached so filtering does
/// not redo the membership matching.
#[derive(Debug, Default)]
pub struct Directory {
    roster: Vec<Employee>,
    records: Vec<ConversationRecord>,
    groups: Vec<Group>,
    employees: Vec<Conversation>,
    group_list: Vec<Conversation>,
    filter: DirectoryFilter,
    search_input: String,
    search: Debounced<String>,
}

impl Directory {
    pub fn set_roster(&mut self, roster: Vec<Employee>) {
        self.roster = roster;
        self.employees = merge(&self.roster, &self.records);
    }

    pub fn set_records(&mut self, records: Vec<ConversationRecord>) {
        self.records = records;
        self.employees = merge(&self.roster, &self.records);
        self.group_list = group_conversations(&self.records, &self.groups);
    }

    pub fn set_groups(&mut self, groups: Vec<Group>) {
        self.groups = groups;
        self.group_list = group_conversations(&self.records, &self.groups);
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn roster(&self) -> &[Employee] {
        &self.roster
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn filter(&self) -> &DirectoryFilter {
        &self.filter
    }

    /// Raw (not yet applied) search text, for echoing in the input box.
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Record a search keystroke; returns the generation to settle after the debounce.
    pub fn submit_search(&mut self, term: String) -> u64 {
        self.search_input = term.clone();
        self.search.submit(term)
    }

    /// Apply the pending search term if `generation` is the latest. Returns true if applied.
    pub fn settle_search(&mut self, generation: u64) -> bool {
        match self.search.settle(generation) {
            Some(term) if term != self.filter.search => {
                self.filter.search = term;
                true
            }
            _ => false,
        }
    }

    pub fn set_unread_only(&mut self, unread_only: bool) {
        self.filter.unread_only = unread_only;
    }

    pub fn employee_conversations(&self) -> Vec<&Conversation> {
        self.employees
            .iter()
            .filter(|c| self.filter.matches(c))
            .collect()
    }

    pub fn group_conversations(&self) -> Vec<&Conversation> {
        self.group_list
            .iter()
            .filter(|c| self.filter.matches(c))
            .collect()
    }

    /// Employee and group conversations in one list, most recent first.
    pub fn combined(&self) -> Vec<&Conversation> {
        let mut all: Vec<&Conversation> = self
            .employee_conversations()
            .into_iter()
            .chain(self.group_conversations())
            .collect();
        all.sort_by(|a, b| by_recency(a, b));
        all
    }

    /// Look up a conversation by id, ignoring filters.
    pub fn find(&self, id: &ConversationId) -> Option<&Conversation> {
        self.employees
            .iter()
            .chain(self.group_list.iter())
            .find(|c| &c.id == id)
    }
}
