use chrono::{DateTime, Utc};

use crate::models::Participant;

pub fn sync(participants: &mut Vec<Participant>, snapshot: Vec<Participant>) -> bool {
    if *participants == snapshot {
        return false;
    }
    *participants = snapshot;
    true
}

pub fn join(participants: &mut Vec<Participant>, participant: Participant) -> bool {
    participants.push(participant);
    true
}

pub fn leave(participants: &mut Vec<Participant>, id: &str) -> bool {
    let before = participants.len();
    participants.retain(|p| p.id != id);
    participants.len() != before
}

/// Patch typing state, current line and last-seen of a known participant.
/// Unknown ids are ignored, activity never creates an entry.
pub fn activity(
    participants: &mut [Participant],
    id: &str,
    is_typing: bool,
    current_line: Option<u32>,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;
    for p in participants.iter_mut().filter(|p| p.id == id) {
        let last_seen_at = p.last_seen_at.max(now);
        if p.is_typing != is_typing || p.current_line != current_line || p.last_seen_at != last_seen_at {
            p.is_typing = is_typing;
            p.current_line = current_line;
            p.last_seen_at = last_seen_at;
            changed = true;
        }
    }
    changed
}
