use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member of the room as broadcast by the server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(rename = "lastSeen", default)]
    pub last_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default)]
    pub current_line: Option<u32>,
}

/// Liveness bucket derived from how long ago a participant was last seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
}

impl Participant {
    pub fn status_at(&self, now: DateTime<Utc>) -> PresenceStatus {
        let idle = now.signed_duration_since(self.last_seen_at).num_seconds();
        if idle < 60 {
            PresenceStatus::Online
        } else if idle < 5 * 60 {
            PresenceStatus::Away
        } else {
            PresenceStatus::Offline
        }
    }

    /// Human readable "last seen" label, e.g. `Just now`, `4m ago`, `2h ago`
    pub fn format_last_seen(&self, now: DateTime<Utc>) -> String {
        let idle = now.signed_duration_since(self.last_seen_at);
        if idle.num_minutes() < 1 {
            "Just now".to_string()
        } else if idle.num_hours() < 1 {
            format!("{}m ago", idle.num_minutes())
        } else {
            format!("{}h ago", idle.num_hours())
        }
    }
}

pub fn count_online(participants: &[Participant], now: DateTime<Utc>) -> usize {
    participants
        .iter()
        .filter(|p| p.status_at(now) == PresenceStatus::Online)
        .count()
}

pub fn count_typing(participants: &[Participant]) -> usize {
    participants.iter().filter(|p| p.is_typing).count()
}
