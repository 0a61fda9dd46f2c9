use std::time::Duration;

/// Host-driven debounce timer.
///
/// Every [`Debouncer::trigger`] restarts the quiet period; [`Debouncer::advance`]
/// reports expiry exactly once per armed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay: Duration,
    remaining: Option<Duration>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            remaining: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }

    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining
    }

    pub fn trigger(&mut self) {
        self.remaining = Some(self.delay);
    }

    /// Returns `true` when the pending period has elapsed.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        match remaining.checked_sub(elapsed) {
            Some(left) if !left.is_zero() => {
                self.remaining = Some(left);
                false
            }
            _ => {
                self.remaining = None;
                true
            }
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.remaining.take().is_some()
    }
}
