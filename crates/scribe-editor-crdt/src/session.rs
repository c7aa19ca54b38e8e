//! One editing session: local buffer, shared text, history and undo/redo.
//!
//! The session is driven entirely from outside. Every entry point takes the
//! current time, does its work synchronously, and leaves timers armed for
//! the host to fire later through [`EditingSession::poll_timers`].
//!
//! Data flow for a keystroke:
//!
//! ```text
//! on_local_edit(next)
//!   -> delta applied to EditorRope
//!   -> delta committed to the shared text (origin = local)
//!   -> listener sees the local update -> history push scheduled (debounced)
//! ```
//!
//! Remote updates only refresh the local buffer. Undo/redo writes are tagged
//! `undo-redo` and, like anything arriving while the controller settles,
//! never reach history.

use loro::Subscription;
use scribe_common::EditorConfig;
use scribe_editor_core::{EditorRope, HistoryStack, TextBuffer, TextDelta};
use serde::Serialize;
use tokio::sync::mpsc;
use web_time::Instant;

use crate::buffer::LoroTextBuffer;
use crate::error::CrdtError;
use crate::origin::{Origin, SharedTextUpdate};
use crate::patcher;
use crate::undo::{UndoContext, UndoOutcome, UndoRedoController};

/// Immutable view of a session for the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub text: String,
    pub can_undo: bool,
    pub can_redo: bool,
    pub history_len: usize,
    pub redo_len: usize,
    pub undo_redo_in_progress: bool,
    pub closed: bool,
}

/// Shared-text wiring that exists only once a document is attached.
struct Attachment {
    shared: LoroTextBuffer,
    updates: mpsc::UnboundedReceiver<SharedTextUpdate>,
    _subscription: Subscription,
}

pub struct EditingSession {
    local: EditorRope,
    attachment: Option<Attachment>,
    history: HistoryStack,
    undo_redo: UndoRedoController,
    closed: bool,
}

impl EditingSession {
    /// Open a session showing `initial`, with no shared text yet.
    pub fn open(config: &EditorConfig, initial: &str) -> Self {
        tracing::debug!(len = initial.len(), "editing session opened");
        Self {
            local: EditorRope::from_str(initial),
            attachment: None,
            history: HistoryStack::new(config.max_history, config.history_debounce()),
            undo_redo: UndoRedoController::new(config.settle_delay()),
            closed: false,
        }
    }

    /// Bind the session to a shared document.
    ///
    /// An empty document is seeded with the local text. A non-empty one wins
    /// and the local buffer adopts it. Either way the resulting text becomes
    /// the history baseline if history has not started yet.
    pub fn attach_shared_text(&mut self, mut shared: LoroTextBuffer) -> Result<(), CrdtError> {
        if self.closed {
            return Err(CrdtError::SessionClosed);
        }

        let local = self.local.to_string();
        if shared.is_empty() {
            patcher::apply_delta(Some(&mut shared), "", &local, Origin::Local);
        } else {
            self.local.set_text(&shared.to_string());
        }

        // Subscribe after seeding so the seed never reaches history.
        let (tx, updates) = mpsc::unbounded_channel();
        let subscription = shared.subscribe(move |update| {
            let _ = tx.send(update);
        });

        self.history.initialize(&self.local.to_string());
        self.attachment = Some(Attachment {
            shared,
            updates,
            _subscription: subscription,
        });
        tracing::debug!("shared text attached");
        Ok(())
    }

    /// The editing surface replaced its text with `next`.
    ///
    /// `next` was derived from the text the surface last showed. If the
    /// shared text has moved on since (a peer update still queued), the edit
    /// is rebased over that change before it is committed, and the local
    /// buffer then adopts the merged result.
    pub fn on_local_edit(&mut self, next: &str, now: Instant) {
        if self.closed {
            return;
        }
        let previous = self.local.to_string();
        let Some(delta) = TextDelta::between(&previous, next) else {
            return;
        };
        if !self.history.is_initialized() {
            self.history.initialize(&previous);
        }

        match self.attachment.as_mut() {
            Some(attachment) => {
                let base = attachment.shared.to_string();
                let merged = match TextDelta::between(&previous, &base) {
                    Some(unseen) => {
                        tracing::debug!(
                            start = unseen.start,
                            "rebasing local edit over unseen shared change"
                        );
                        let merged = delta.rebase(&unseen).apply_to_str(&base);
                        self.local.set_text(&merged);
                        merged
                    }
                    None => {
                        delta.apply(&mut self.local);
                        next.to_owned()
                    }
                };
                patcher::apply_delta(Some(&mut attachment.shared), &base, &merged, Origin::Local);
                self.pump_shared_text_events(now);
            }
            // No listener to observe the write, so capture directly.
            None => {
                delta.apply(&mut self.local);
                if !self.undo_redo.is_in_progress() {
                    self.history.schedule_push(next, true, now);
                }
            }
        }
    }

    pub fn handle_undo(&mut self, now: Instant) -> UndoOutcome {
        if self.closed {
            return UndoOutcome::Nothing;
        }
        self.pump_shared_text_events(now);
        let outcome = {
            let (ctx, controller) = self.undo_context();
            controller.handle_undo(ctx, now)
        };
        self.pump_shared_text_events(now);
        outcome
    }

    pub fn handle_redo(&mut self, now: Instant) -> UndoOutcome {
        if self.closed {
            return UndoOutcome::Nothing;
        }
        self.pump_shared_text_events(now);
        let outcome = {
            let (ctx, controller) = self.undo_context();
            controller.handle_redo(ctx, now)
        };
        self.pump_shared_text_events(now);
        outcome
    }

    fn undo_context(&mut self) -> (UndoContext<'_>, &mut UndoRedoController) {
        let ctx = UndoContext {
            history: &mut self.history,
            local: &mut self.local,
            shared: self.attachment.as_mut().map(|a| &mut a.shared),
        };
        (ctx, &mut self.undo_redo)
    }

    /// Merge an update received from a peer.
    pub fn apply_remote_update(&mut self, data: &[u8], now: Instant) -> Result<(), CrdtError> {
        if self.closed {
            return Err(CrdtError::SessionClosed);
        }
        let attachment = self.attachment.as_ref().ok_or(CrdtError::Uninitialized)?;
        attachment.shared.import(data)?;
        self.pump_shared_text_events(now);
        Ok(())
    }

    /// React to queued shared-text updates.
    pub fn pump_shared_text_events(&mut self, now: Instant) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };

        while let Ok(update) = attachment.updates.try_recv() {
            match update.origin {
                Origin::Remote => {
                    let text = attachment.shared.to_string();
                    if !self.local.eq_str(&text) {
                        self.local.set_text(&text);
                    }
                }
                Origin::Local if !self.undo_redo.is_in_progress() => {
                    self.history
                        .schedule_push(attachment.shared.to_string(), true, now);
                }
                origin => {
                    tracing::trace!(%origin, "history capture skipped");
                }
            }
        }
    }

    /// Fire any due debounce or settle timer.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if self.history.poll(now) {
            tracing::debug!(len = self.history.len(), "history committed");
            #[cfg(feature = "telemetry")]
            metrics::counter!("scribe_history_push_total").increment(1);
        }
        if self.undo_redo.poll(now) {
            tracing::trace!("undo/redo settled");
        }
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.history.next_deadline(), self.undo_redo.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn text(&self) -> String {
        self.local.to_string()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn undo_redo(&self) -> &UndoRedoController {
        &self.undo_redo
    }

    /// The attached shared text, e.g. for exporting updates to peers.
    pub fn shared_text(&self) -> Option<&LoroTextBuffer> {
        self.attachment.as_ref().map(|a| &a.shared)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            text: self.local.to_string(),
            can_undo: self.history.len() > 1 || self.history.has_pending(),
            can_redo: self.history.redo_len() > 0,
            history_len: self.history.len(),
            redo_len: self.history.redo_len(),
            undo_redo_in_progress: self.undo_redo.is_in_progress(),
            closed: self.closed,
        }
    }

    /// Tear the session down: cancel timers and release the subscription.
    ///
    /// Idempotent. Every other entry point is a no-op afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.history.cancel_debounce();
        self.undo_redo.cancel();
        self.attachment = None;
        self.closed = true;
        tracing::debug!("editing session closed");
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        self.close();
    }
}
