//! List surgery for cursor-paginated message windows
//!
//! The cache keeps each conversation's messages ascending by timestamp
//! with unique ids. Every mutation of that list funnels through here:
//! prepending an older page, appending a new message, and reconciling an
//! optimistic placeholder with its confirmed record.

use crate::model::Message;
use std::collections::HashSet;

/// Merge an older page into an existing ascending window.
///
/// Page messages whose id already exists are dropped, the remainder is
/// sorted ascending and prepended. The existing slice is assumed sorted;
/// the result is too.
pub fn merge_older(existing: &[Message], older_page: Vec<Message>) -> Vec<Message> {
    let mut seen: HashSet<String> = existing.iter().map(|m| m.id.clone()).collect();

    let mut fresh: Vec<Message> = Vec::with_capacity(older_page.len());
    for msg in older_page {
        // also drops duplicates within the page itself
        if !seen.insert(msg.id.clone()) {
            continue;
        }
        fresh.push(msg);
    }
    // older pages normally arrive sorted, but the backend does not promise it
    fresh.sort_by_key(|m| m.timestamp);

    let mut merged = fresh;
    merged.extend_from_slice(existing);
    merged
}

/// Append a message keeping ascending order. A message older than the tail
/// is inserted at its sorted position instead of blindly pushed.
pub fn append_message(messages: &mut Vec<Message>, msg: Message) {
    if messages.iter().any(|m| m.id == msg.id) {
        return;
    }
    match messages.last() {
        Some(last) if last.timestamp > msg.timestamp => {
            let pos = messages.partition_point(|m| m.timestamp <= msg.timestamp);
            messages.insert(pos, msg);
        }
        _ => messages.push(msg),
    }
}

/// Replace the placeholder matching the confirmed message's
/// `client_temp_id`, in place. Returns true if a placeholder was replaced;
/// otherwise the confirmation is appended in order.
pub fn reconcile_placeholder(messages: &mut Vec<Message>, confirmed: Message) -> bool {
    let temp_id = confirmed.client_temp_id.as_deref();
    if let Some(temp_id) = temp_id {
        if let Some(pos) = messages
            .iter()
            .position(|m| m.is_placeholder() && m.client_temp_id.as_deref() == Some(temp_id))
        {
            messages[pos] = confirmed;
            return true;
        }
    }
    append_message(messages, confirmed);
    false
}

/// True when the slice is non-decreasing by timestamp
pub fn is_ordered(messages: &[Message]) -> bool {
    messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

/// True when no two messages share an id
pub fn has_unique_ids(messages: &[Message]) -> bool {
    let mut seen = HashSet::new();
    messages.iter().all(|m| seen.insert(m.id.as_str()))
}
