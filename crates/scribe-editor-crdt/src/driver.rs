//! Async event loop around an [`EditingSession`].
//!
//! Everything the session reacts to arrives on one task: editor commands,
//! OS reachability, transport handshake status, and the session's own timer
//! deadlines. After each reaction the loop publishes an [`EditorState`] on a
//! watch channel for the UI to render.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant as TokioInstant;
use web_time::{Duration, Instant};

use crate::connection::{
    ConnectionStatus, ConnectionStatusMonitor, Reachability, Transport, TransportStatus,
};
use crate::session::{EditingSession, SessionSnapshot};

/// Commands from the editing surface.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// The editor's full text after a user edit.
    LocalEdit(String),
    Undo,
    Redo,
    /// Loro update bytes received from a peer.
    RemoteUpdate(Vec<u8>),
    /// Close the session and stop the loop.
    Close,
}

/// Everything the UI needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorState {
    pub document: SessionSnapshot,
    pub connection: ConnectionStatus,
}

/// Event sources the driver subscribes to.
pub struct SessionInputs<T> {
    pub commands: mpsc::UnboundedReceiver<SessionCommand>,
    pub reachability: watch::Receiver<Reachability>,
    pub transport_status: watch::Receiver<TransportStatus>,
    /// Read for the transport's current connected flag.
    pub transport: T,
}

pub struct SessionDriver<T> {
    session: EditingSession,
    monitor: ConnectionStatusMonitor,
    inputs: SessionInputs<T>,
    state_tx: watch::Sender<EditorState>,
}

/// Idle wait used when no timer is pending; any input wakes the loop sooner.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

fn now() -> Instant {
    TokioInstant::now().into_std()
}

impl<T: Transport> SessionDriver<T> {
    /// Mount the connection monitor and create the state channel.
    pub fn new(
        session: EditingSession,
        mut inputs: SessionInputs<T>,
    ) -> (Self, watch::Receiver<EditorState>) {
        let reachability = *inputs.reachability.borrow_and_update();
        inputs.transport_status.borrow_and_update();
        let monitor = ConnectionStatusMonitor::mount(reachability, &inputs.transport);

        let state = EditorState {
            document: session.snapshot(),
            connection: monitor.status(),
        };
        let (state_tx, state_rx) = watch::channel(state);

        (
            Self {
                session,
                monitor,
                inputs,
                state_tx,
            },
            state_rx,
        )
    }

    /// Run until `Close` is received or the command channel closes.
    ///
    /// The session is closed and all subscriptions are released on return.
    pub async fn run(mut self) {
        let mut reachability_open = true;
        let mut transport_open = true;

        loop {
            let deadline = self.session.next_deadline();
            let wake_at = match deadline {
                Some(at) => TokioInstant::from_std(at),
                None => TokioInstant::now() + IDLE_WAIT,
            };

            tokio::select! {
                command = self.inputs.commands.recv() => match command {
                    Some(SessionCommand::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },
                changed = self.inputs.reachability.changed(), if reachability_open => {
                    match changed {
                        Ok(()) => {
                            let reachability = *self.inputs.reachability.borrow_and_update();
                            self.monitor.on_reachability(reachability, &self.inputs.transport);
                        }
                        Err(_) => reachability_open = false,
                    }
                }
                changed = self.inputs.transport_status.changed(), if transport_open => {
                    match changed {
                        Ok(()) => {
                            let status = *self.inputs.transport_status.borrow_and_update();
                            self.monitor.on_transport_status(status, &self.inputs.transport);
                        }
                        Err(_) => transport_open = false,
                    }
                }
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    self.session.poll_timers(now());
                },
            }

            self.publish();
        }

        self.session.close();
        self.publish();
        tracing::debug!("session driver stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        let now = now();
        match command {
            SessionCommand::LocalEdit(text) => self.session.on_local_edit(&text, now),
            SessionCommand::Undo => {
                self.session.handle_undo(now);
            }
            SessionCommand::Redo => {
                self.session.handle_redo(now);
            }
            SessionCommand::RemoteUpdate(data) => {
                if let Err(e) = self.session.apply_remote_update(&data, now) {
                    tracing::warn!(error = %e, "dropping remote update");
                }
            }
            SessionCommand::Close => {}
        }
    }

    fn publish(&self) {
        let state = EditorState {
            document: self.session.snapshot(),
            connection: self.monitor.status(),
        };
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LoroTextBuffer;
    use scribe_common::EditorConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Harness {
        commands: mpsc::UnboundedSender<SessionCommand>,
        reachability: watch::Sender<Reachability>,
        transport_status: watch::Sender<TransportStatus>,
        transport: Arc<AtomicBool>,
        state: watch::Receiver<EditorState>,
    }

    fn spawn_driver() -> (SessionDriver<Arc<AtomicBool>>, Harness) {
        let mut session = EditingSession::open(&EditorConfig::default(), "");
        session.attach_shared_text(LoroTextBuffer::new()).unwrap();

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (reachability_tx, reachability) = watch::channel(Reachability::Online);
        let (status_tx, transport_status) = watch::channel(TransportStatus::Connecting);
        let transport = Arc::new(AtomicBool::new(false));

        let (driver, state) = SessionDriver::new(
            session,
            SessionInputs {
                commands,
                reachability,
                transport_status,
                transport: transport.clone(),
            },
        );
        (
            driver,
            Harness {
                commands: commands_tx,
                reachability: reachability_tx,
                transport_status: status_tx,
                transport,
                state,
            },
        )
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_history_through_driver() {
        let (driver, h) = spawn_driver();

        let script = async {
            h.commands.send(SessionCommand::LocalEdit("a".into())).unwrap();
            settle(300).await;
            h.commands.send(SessionCommand::LocalEdit("ab".into())).unwrap();
            settle(300).await;
            assert_eq!(h.state.borrow().document.history_len, 0);

            settle(1000).await;
            {
                let state = h.state.borrow();
                assert_eq!(state.document.text, "ab");
                assert_eq!(state.document.history_len, 2);
            }

            h.commands.send(SessionCommand::Undo).unwrap();
            settle(10).await;
            {
                let state = h.state.borrow();
                assert_eq!(state.document.text, "");
                assert!(state.document.can_redo);
                assert!(state.document.undo_redo_in_progress);
            }

            settle(200).await;
            assert!(!h.state.borrow().document.undo_redo_in_progress);

            h.commands.send(SessionCommand::Close).unwrap();
        };

        tokio::join!(driver.run(), script);
        assert!(h.state.borrow().document.closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_status_through_driver() {
        let (driver, h) = spawn_driver();
        assert_eq!(h.state.borrow().connection, ConnectionStatus::Connecting);

        let script = async {
            h.transport.store(true, Ordering::Release);
            h.transport_status.send(TransportStatus::Connected).unwrap();
            settle(1).await;
            assert_eq!(h.state.borrow().connection, ConnectionStatus::Connected);

            h.reachability.send(Reachability::Offline).unwrap();
            settle(1).await;
            assert_eq!(h.state.borrow().connection, ConnectionStatus::Offline);

            h.reachability.send(Reachability::Online).unwrap();
            settle(1).await;
            assert_eq!(h.state.borrow().connection, ConnectionStatus::Connected);

            h.commands.send(SessionCommand::Close).unwrap();
        };

        tokio::join!(driver.run(), script);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_drops_pending_history() {
        let (driver, h) = spawn_driver();

        let script = async {
            h.commands.send(SessionCommand::LocalEdit("unsaved".into())).unwrap();
            settle(100).await;
            h.commands.send(SessionCommand::Close).unwrap();
        };

        tokio::join!(driver.run(), script);
        let state = h.state.borrow();
        assert!(state.document.closed);
        assert_eq!(state.document.history_len, 0);
    }
}
