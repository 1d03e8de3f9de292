use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::Participant;

const ADJECTIVES: [&str; 8] = ["Red", "Blue", "Green", "Yellow", "Purple", "Orange", "Pink", "Brown"];
const NOUNS: [&str; 8] = ["Cat", "Dog", "Bird", "Fish", "Bear", "Lion", "Tiger", "Wolf"];
const COLORS: [&str; 8] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#e67e22", "#34495e",
];
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Ephemeral identity of the local participant
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub color: String,
}

impl Identity {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng(), Utc::now())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
        let color = COLORS[rng.gen_range(0..COLORS.len())];

        Self {
            id: format!("user_{}_{}", now.timestamp_millis(), suffix),
            display_name: format!("{} {}", adjective, noun),
            color: color.to_string(),
        }
    }

    /// The participant record announced in `join-room`
    pub fn to_participant(&self, now: DateTime<Utc>) -> Participant {
        Participant {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            color: self.color.clone(),
            last_seen_at: now,
            is_typing: false,
            current_line: None,
        }
    }
}
