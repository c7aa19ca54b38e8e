//! Snapshot-based undo history with a debounced commit.
//!
//! History entries are full-text snapshots, not operations. Bursts of edits
//! are coalesced by a single debounce timer so one pause in typing becomes
//! one undo step. The redo stack is kept alongside; its front is the most
//! recently undone snapshot.

use std::collections::VecDeque;

use smol_str::SmolStr;
use web_time::{Duration, Instant};

use crate::timer::PendingTimer;

/// Maximum number of snapshots kept in history.
pub const MAX_HISTORY: usize = 200;

/// Quiet period after the last edit before it is committed to history.
pub const HISTORY_DEBOUNCE: Duration = Duration::from_millis(900);

/// An immutable full-text snapshot.
pub type HistoryEntry = SmolStr;

/// Work carried by the debounce timer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPush {
    value: HistoryEntry,
    reset_redo: bool,
}

/// Bounded undo history plus redo stack.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    redo: VecDeque<HistoryEntry>,
    /// Text the session started from. `None` until initialized.
    baseline: Option<HistoryEntry>,
    max_entries: usize,
    debounce: Duration,
    pending: PendingTimer<PendingPush>,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(MAX_HISTORY, HISTORY_DEBOUNCE)
    }
}

impl HistoryStack {
    /// Create an uninitialized history.
    ///
    /// `max_entries` is clamped to at least one.
    pub fn new(max_entries: usize, debounce: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            redo: VecDeque::new(),
            baseline: None,
            max_entries: max_entries.max(1),
            debounce,
            pending: PendingTimer::idle(),
        }
    }

    /// Seed history with the session's starting text.
    ///
    /// One-time: returns false and does nothing if already initialized. An
    /// empty starting text leaves history empty; it is recorded as the
    /// baseline and materialised by the first push.
    pub fn initialize(&mut self, initial: &str) -> bool {
        if self.baseline.is_some() {
            return false;
        }
        let initial = SmolStr::new(initial);
        self.entries.clear();
        if !initial.is_empty() {
            self.entries.push_back(initial.clone());
        }
        self.redo.clear();
        self.baseline = Some(initial);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.baseline.is_some()
    }

    /// Append a snapshot unless it equals the current top.
    ///
    /// Drops the oldest entries once the bound is exceeded. Returns whether
    /// anything was appended.
    pub fn push(&mut self, value: impl Into<HistoryEntry>) -> bool {
        let value = value.into();

        if self.entries.is_empty() {
            if let Some(baseline) = &self.baseline {
                if *baseline != value {
                    self.entries.push_back(baseline.clone());
                }
            }
        }

        if self.entries.back() == Some(&value) {
            return false;
        }

        self.entries.push_back(value);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        tracing::trace!(len = self.entries.len(), "history push");
        true
    }

    /// (Re)arm the debounce timer to push `value` once edits go quiet.
    ///
    /// Any previously scheduled push is cancelled, so a burst of calls
    /// results in a single push of the last value.
    pub fn schedule_push(
        &mut self,
        value: impl Into<HistoryEntry>,
        reset_redo: bool,
        now: Instant,
    ) {
        let pending = PendingPush {
            value: value.into(),
            reset_redo,
        };
        self.pending.arm(now, self.debounce, pending);
    }

    /// Perform the scheduled push right away, if one is pending.
    ///
    /// Used before undo so edits still inside the debounce window are not lost.
    pub fn flush_debounce(&mut self) -> bool {
        match self.pending.cancel() {
            Some(pending) => {
                self.commit(pending);
                true
            }
            None => false,
        }
    }

    /// Drop the scheduled push without performing it.
    pub fn cancel_debounce(&mut self) -> bool {
        self.pending.cancel().is_some()
    }

    /// Fire the debounce timer if it is due. Returns whether it fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending.take_due(now) {
            Some(pending) => {
                self.commit(pending);
                true
            }
            None => false,
        }
    }

    fn commit(&mut self, pending: PendingPush) {
        self.push(pending.value);
        if pending.reset_redo {
            self.redo.clear();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// The most recently committed snapshot.
    pub fn top(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Remove and return the most recent snapshot.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(SmolStr::as_str)
    }

    /// Put an undone snapshot on the front of the redo stack.
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push_front(entry);
    }

    /// Take the most recently undone snapshot.
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop_front()
    }

    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Redo snapshots, most recently undone first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &str> {
        self.redo.iter().map(SmolStr::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn entries(history: &HistoryStack) -> Vec<&str> {
        history.entries().collect()
    }

    #[test]
    fn test_initialize_is_one_time() {
        let mut history = HistoryStack::default();
        assert!(history.initialize("seed"));
        assert!(!history.initialize("other"));
        assert_eq!(entries(&history), ["seed"]);
    }

    #[test]
    fn test_empty_baseline_materialises_on_first_push() {
        let mut history = HistoryStack::default();
        history.initialize("");
        assert!(history.is_empty());

        history.push("a");
        history.push("ab");
        assert_eq!(entries(&history), ["", "a", "ab"]);
    }

    #[test]
    fn test_push_dedups_top() {
        let mut history = HistoryStack::default();
        history.initialize("x");
        assert!(!history.push("x"));
        assert!(history.push("xy"));
        assert!(!history.push("xy"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_bound_evicts_oldest_first() {
        let mut history = HistoryStack::default();
        history.initialize("0");
        for i in 1..=250 {
            history.push(i.to_string());
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.entries().next(), Some("51"));
        assert_eq!(history.top().map(SmolStr::as_str), Some("250"));
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let t0 = Instant::now();
        let mut history = HistoryStack::default();
        history.initialize("");

        history.schedule_push("a", true, t0);
        history.schedule_push("ab", true, t0 + ms(500));
        history.schedule_push("abc", true, t0 + ms(1000));

        assert!(!history.poll(t0 + ms(1400)));
        assert!(history.poll(t0 + ms(1900)));
        assert_eq!(entries(&history), ["", "abc"]);
        assert!(!history.has_pending());
    }

    #[test]
    fn test_flush_performs_pending_push_and_resets_redo() {
        let t0 = Instant::now();
        let mut history = HistoryStack::default();
        history.initialize("a");
        history.push_redo(SmolStr::new("ab"));

        history.schedule_push("ax", true, t0);
        assert!(history.flush_debounce());
        assert_eq!(entries(&history), ["a", "ax"]);
        assert_eq!(history.redo_len(), 0);
        assert!(!history.flush_debounce());
    }

    #[test]
    fn test_push_without_reset_keeps_redo() {
        let t0 = Instant::now();
        let mut history = HistoryStack::default();
        history.initialize("a");
        history.push_redo(SmolStr::new("ab"));

        history.schedule_push("ay", false, t0);
        assert!(history.poll(t0 + HISTORY_DEBOUNCE));
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let t0 = Instant::now();
        let mut history = HistoryStack::default();
        history.initialize("a");
        history.schedule_push("ab", true, t0);
        assert!(history.cancel_debounce());
        assert!(!history.poll(t0 + ms(5000)));
        assert_eq!(entries(&history), ["a"]);
    }

    #[test]
    fn test_redo_is_front_first() {
        let mut history = HistoryStack::default();
        history.push_redo(SmolStr::new("ab"));
        history.push_redo(SmolStr::new("a"));
        assert_eq!(history.redo_entries().collect::<Vec<_>>(), ["a", "ab"]);
        assert_eq!(history.pop_redo().as_deref(), Some("a"));
    }
}
