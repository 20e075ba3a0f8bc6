//! Resolution of virtual conversations to their persisted counterparts.

use super::directory;
use crate::models::{Conversation, ConversationRecord};

/// Persisted replacement for a virtual conversation, if the backend has one.
/// Returns `None` for persisted inputs and for virtual ones with no match.
pub fn try_resolve(
    conversation: &Conversation,
    known: &[ConversationRecord],
) -> Option<Conversation> {
    let participant = conversation.id.virtual_participant()?;
    let record = directory::find_private(known, participant)?;
    let mut resolved = Conversation::from_record(
        record,
        Some(conversation.display_name.clone()),
        Some(participant.to_string()),
    );
    // Keep whatever summary the placeholder already had if the record has none.
    if resolved.last_message.is_none() {
        resolved.last_message = conversation.last_message.clone();
    }
    Some(resolved)
}

/// `try_resolve`, falling back to the input unchanged.
pub fn resolve(conversation: Conversation, known: &[ConversationRecord]) -> Conversation {
    try_resolve(&conversation, known).unwrap_or(conversation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationId, Employee};
    use serde_json::json;

    fn placeholder(id: u64) -> Conversation {
        let e: Employee = serde_json::from_value(json!({"id": id, "name": "Pat"})).unwrap();
        Conversation::placeholder(&e)
    }

    fn records() -> Vec<ConversationRecord> {
        serde_json::from_value(json!([
            {"id": "g1", "type": "group", "members": [42]},
            {"id": 555, "participants": {"42": {}}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolves_virtual_to_persisted() {
        let resolved = resolve(placeholder(42), &records());
        assert_eq!(resolved.id, ConversationId::Persisted("555".into()));
        assert_eq!(resolved.display_name, "Pat");
        assert_eq!(resolved.participant_ref.as_deref(), Some("42"));
    }

    #[test]
    fn test_unmatched_is_unchanged() {
        let input = placeholder(7);
        assert_eq!(resolve(input.clone(), &records()), input);
        assert!(try_resolve(&input, &records()).is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let known = records();
        for input in [placeholder(42), placeholder(7)] {
            let once = resolve(input, &known);
            let twice = resolve(once.clone(), &known);
            assert_eq!(once, twice);
        }
    }
}
