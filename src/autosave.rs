//! Debounce timer for layout autosave.

use std::time::Duration;

use tokio::time::Instant;

/// Single pending deadline. Re-arming replaces the previous one, so a burst of
/// changes produces one save `delay` after the last change.
#[derive(Debug, Clone)]
pub struct AutosaveDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutosaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Clears and reports the deadline once `now` has reached it.
    pub fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
