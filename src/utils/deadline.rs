use std::future;
use std::time::Duration;

use tokio::time::{self, Instant};

/// A single re-armable timer for use inside `select!` loops.
///
/// An unarmed deadline never fires. Re-arming replaces the previous deadline.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, after: Duration) {
        self.at = Some(Instant::now() + after);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Resolves once the armed deadline passes, then disarms.
    /// Cancel safe: dropping the future leaves the deadline armed.
    pub async fn fired(&mut self) {
        match self.at {
            Some(at) => {
                time::sleep_until(at).await;
                self.at = None;
            }
            None => future::pending::<()>().await,
        }
    }
}
