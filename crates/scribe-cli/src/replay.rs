//! Scripted editing sessions on a virtual clock.

use std::sync::atomic::{AtomicBool, Ordering};

use scribe_common::{EditorConfig, ScribeError};
use scribe_editor_crdt::{
    ConnectionStatusMonitor, EditingSession, EditorState, LoroTextBuffer, Reachability,
    TransportStatus,
};
use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

/// A recorded session: starting text plus the events to feed it.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub initial: String,
    /// Keep the session detached from any shared text.
    #[serde(default)]
    pub detached: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// The editor's full text after a keystroke.
    Edit { text: String },
    Undo,
    Redo,
    /// Advance the clock, firing any timers that fall due.
    Wait { ms: u64 },
    Network { online: bool },
    Transport {
        status: TransportStatus,
        #[serde(default)]
        connected: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub elapsed_ms: u128,
    #[serde(flatten)]
    pub state: EditorState,
    pub history: Vec<String>,
    pub redo: Vec<String>,
}

pub struct Replay {
    session: EditingSession,
    monitor: ConnectionStatusMonitor,
    transport: AtomicBool,
    start: Instant,
    elapsed: Duration,
}

impl Replay {
    pub fn new(config: &EditorConfig, script: &Script) -> Result<Self, ScribeError> {
        let mut session = EditingSession::open(config, &script.initial);
        if !script.detached {
            session.attach_shared_text(LoroTextBuffer::new())?;
        }
        let transport = AtomicBool::new(false);
        let monitor = ConnectionStatusMonitor::mount(Reachability::Online, &transport);

        Ok(Self {
            session,
            monitor,
            transport,
            start: Instant::now(),
            elapsed: Duration::ZERO,
        })
    }

    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    pub fn step(&mut self, step: &Step) {
        let now = self.now();
        tracing::trace!(?step, at_ms = self.elapsed.as_millis(), "replay step");
        match step {
            Step::Edit { text } => self.session.on_local_edit(text, now),
            Step::Undo => {
                self.session.handle_undo(now);
            }
            Step::Redo => {
                self.session.handle_redo(now);
            }
            Step::Wait { ms } => self.advance(Duration::from_millis(*ms)),
            Step::Network { online } => {
                let reachability = if *online {
                    Reachability::Online
                } else {
                    Reachability::Offline
                };
                self.monitor.on_reachability(reachability, &self.transport);
            }
            Step::Transport { status, connected } => {
                self.transport.store(*connected, Ordering::Release);
                self.monitor.on_transport_status(*status, &self.transport);
            }
        }
    }

    /// Move the clock forward, firing each due timer at its own deadline.
    fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        while let Some(deadline) = self.session.next_deadline() {
            if deadline > target {
                break;
            }
            self.session.poll_timers(deadline);
        }
        self.elapsed += by;
    }

    pub fn run(mut self, steps: &[Step]) -> Report {
        for step in steps {
            self.step(step);
        }
        self.report()
    }

    pub fn report(&self) -> Report {
        let history = self.session.history();
        Report {
            elapsed_ms: self.elapsed.as_millis(),
            state: EditorState {
                document: self.session.snapshot(),
                connection: self.monitor.status(),
            },
            history: history.entries().map(str::to_owned).collect(),
            redo: history.redo_entries().map(str::to_owned).collect(),
        }
    }
}
