//! Snapshot undo/redo across the local buffer and the shared text.
//!
//! Undo and redo write to the shared text themselves, and that write comes
//! back through the same listener that captures history for local edits.
//! While an undo/redo is settling, the controller reports itself as in
//! progress and the session's history capture ignores every update.

use scribe_editor_core::{
    EditorRope, HistoryEntry, HistoryStack, PendingTimer, TextBuffer, TextDelta,
};
use web_time::{Duration, Instant};

use crate::buffer::LoroTextBuffer;
use crate::origin::Origin;
use crate::patcher;

/// Default time the guard stays up after an undo/redo write.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Phase of the undo/redo controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoRedoPhase {
    /// History capture runs normally.
    #[default]
    Idle,
    /// An undo/redo write was just issued; its echo is still expected.
    Settling,
}

/// What an undo/redo call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// Buffers now show this snapshot.
    Applied(HistoryEntry),
    /// History had only its baseline; it was re-applied unchanged.
    Stabilized,
    /// Nothing to undo or redo.
    Nothing,
}

/// The pieces of the session an undo/redo step touches.
pub struct UndoContext<'a> {
    pub history: &'a mut HistoryStack,
    pub local: &'a mut EditorRope,
    pub shared: Option<&'a mut LoroTextBuffer>,
}

impl UndoContext<'_> {
    /// Make both buffers show `target`.
    fn show(&mut self, target: &str) {
        if let Some(delta) = TextDelta::between(&self.local.to_string(), target) {
            delta.apply(&mut *self.local);
        }
        if let Some(shared) = self.shared.as_deref_mut() {
            let current = shared.to_string();
            patcher::apply_delta(Some(shared), &current, target, Origin::UndoRedo);
        }
    }
}

/// Drives undo/redo and owns the settle timer.
#[derive(Debug, Clone)]
pub struct UndoRedoController {
    phase: UndoRedoPhase,
    settle: PendingTimer<()>,
    settle_delay: Duration,
}

impl Default for UndoRedoController {
    fn default() -> Self {
        Self::new(SETTLE_DELAY)
    }
}

impl UndoRedoController {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            phase: UndoRedoPhase::Idle,
            settle: PendingTimer::idle(),
            settle_delay,
        }
    }

    pub fn phase(&self) -> UndoRedoPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == UndoRedoPhase::Settling
    }

    /// Step back one snapshot.
    ///
    /// Pending debounced edits are committed first so they can be undone.
    /// With one or no snapshots left, the baseline is re-applied and nothing
    /// moves to the redo stack.
    pub fn handle_undo(&mut self, mut ctx: UndoContext<'_>, now: Instant) -> UndoOutcome {
        ctx.history.flush_debounce();
        self.phase = UndoRedoPhase::Settling;

        let outcome = if ctx.history.len() <= 1 {
            match ctx.history.top().cloned() {
                Some(baseline) => {
                    ctx.show(&baseline);
                    UndoOutcome::Stabilized
                }
                None => UndoOutcome::Nothing,
            }
        } else {
            let undone = ctx.history.pop();
            if let Some(undone) = undone {
                ctx.history.push_redo(undone);
            }
            match ctx.history.top().cloned() {
                Some(target) => {
                    ctx.show(&target);
                    UndoOutcome::Applied(target)
                }
                None => UndoOutcome::Nothing,
            }
        };

        self.settle.arm(now, self.settle_delay, ());
        tracing::debug!(
            ?outcome,
            history = ctx.history.len(),
            redo = ctx.history.redo_len(),
            "undo"
        );
        #[cfg(feature = "telemetry")]
        metrics::counter!("scribe_undo_total").increment(1);
        outcome
    }

    /// Re-apply the most recently undone snapshot.
    ///
    /// The snapshot goes straight onto history; a pending debounced push is
    /// dropped and the rest of the redo stack is kept.
    pub fn handle_redo(&mut self, mut ctx: UndoContext<'_>, now: Instant) -> UndoOutcome {
        let Some(entry) = ctx.history.pop_redo() else {
            return UndoOutcome::Nothing;
        };
        self.phase = UndoRedoPhase::Settling;

        ctx.show(&entry);
        ctx.history.push(entry.clone());
        ctx.history.cancel_debounce();

        self.settle.arm(now, self.settle_delay, ());
        tracing::debug!(
            history = ctx.history.len(),
            redo = ctx.history.redo_len(),
            "redo"
        );
        #[cfg(feature = "telemetry")]
        metrics::counter!("scribe_redo_total").increment(1);
        UndoOutcome::Applied(entry)
    }

    /// Clear the guard once the settle delay has passed. Returns whether it did.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.settle.take_due(now).is_some() {
            self.phase = UndoRedoPhase::Idle;
            return true;
        }
        false
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    /// Drop the settle timer and return to idle.
    pub fn cancel(&mut self) {
        self.settle.cancel();
        self.phase = UndoRedoPhase::Idle;
    }
}
