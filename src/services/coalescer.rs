use std::time::Duration;

use tracing::debug;

use crate::utils::Deadline;

pub const EDIT_DEBOUNCE_MS: u64 = 100;

/// The latest local edit waiting to go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub room_code: String,
    pub content: String,
}

/// Trailing-edge debouncer for content edits.
///
/// Holds only the newest edit. Every push restarts the quiet period; the edit
/// becomes due once no push arrived for `delay`.
#[derive(Debug)]
pub struct EditCoalescer {
    delay: Duration,
    pending: Option<PendingEdit>,
    deadline: Deadline,
}

impl EditCoalescer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: Deadline::new(),
        }
    }

    pub fn push(&mut self, room_code: &str, content: &str) {
        if self.pending.is_some() {
            debug!("Superseding pending edit for room {}", room_code);
        }
        self.pending = Some(PendingEdit {
            room_code: room_code.to_string(),
            content: content.to_string(),
        });
        self.deadline.arm(self.delay);
    }

    /// Drop the pending edit without sending it
    pub fn cancel(&mut self) {
        self.pending = None;
        self.deadline.cancel();
    }

    /// Take the pending edit now, skipping the rest of the quiet period
    pub fn flush(&mut self) -> Option<PendingEdit> {
        self.deadline.cancel();
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves with the pending edit once the quiet period ends.
    /// Pends forever while nothing is pending.
    pub async fn due(&mut self) -> Option<PendingEdit> {
        self.deadline.fired().await;
        self.pending.take()
    }
}

impl Default for EditCoalescer {
    fn default() -> Self {
        Self::new(Duration::from_millis(EDIT_DEBOUNCE_MS))
    }
}
