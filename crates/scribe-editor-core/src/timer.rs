//! Cancellable deadlines for timer-driven editor state.
//!
//! The editor never sleeps on its own. Owners arm a [`PendingTimer`] with a
//! deadline and the work it should perform, the host reports the current
//! time, and due work is taken out and performed synchronously. Arming an
//! already armed timer cancels the old deadline, so there is never more
//! than one pending instance per purpose.

use web_time::{Duration, Instant};

/// A single-slot timer carrying the payload to act on when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer<T> {
    slot: Option<(Instant, T)>,
}

impl<T> Default for PendingTimer<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> PendingTimer<T> {
    /// A timer with nothing scheduled.
    pub const fn idle() -> Self {
        Self { slot: None }
    }

    /// Schedule `payload` to fire `delay` after `now`.
    ///
    /// Returns the payload of the timer this replaced, if one was pending.
    pub fn arm(&mut self, now: Instant, delay: Duration, payload: T) -> Option<T> {
        self.slot
            .replace((now + delay, payload))
            .map(|(_, cancelled)| cancelled)
    }

    /// Cancel without firing. Returns the cancelled payload.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(_, payload)| payload)
    }

    /// Take the payload if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.slot {
            Some((deadline, _)) if *deadline <= now => self.cancel(),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.as_ref().map(|(deadline, _)| *deadline)
    }
}
