//! Connection status shown to the user.
//!
//! Two independent sources feed one tri-state signal: OS network
//! reachability and the collaboration transport's handshake status. OS
//! reachability wins; a transport cannot be connected while the machine is
//! offline, whatever it last reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// What the status indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Offline,
}

impl ConnectionStatus {
    /// Returns true if edits are reaching peers.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the machine itself has no network.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }
}

/// OS-level network reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    #[default]
    Online,
    Offline,
}

/// Handshake status events emitted by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    #[default]
    Connecting,
    Connected,
}

/// Read side of the collaboration transport.
pub trait Transport {
    /// Whether the transport currently considers itself connected.
    fn is_connected(&self) -> bool;
}

impl Transport for AtomicBool {
    fn is_connected(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Folds reachability and transport events into a [`ConnectionStatus`].
#[derive(Debug, Clone)]
pub struct ConnectionStatusMonitor {
    reachability: Reachability,
    status: ConnectionStatus,
}

impl ConnectionStatusMonitor {
    /// Start monitoring.
    ///
    /// The status starts as `Offline` or `Connecting` from reachability alone
    /// and is then evaluated once against the transport's connected flag.
    pub fn mount(reachability: Reachability, transport: &impl Transport) -> Self {
        let status = match reachability {
            Reachability::Offline => ConnectionStatus::Offline,
            Reachability::Online => ConnectionStatus::Connecting,
        };
        let mut monitor = Self {
            reachability,
            status,
        };
        monitor.evaluate(transport.is_connected());
        monitor
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    /// OS went online or offline.
    ///
    /// Returns the new status if it changed.
    pub fn on_reachability(
        &mut self,
        reachability: Reachability,
        transport: &impl Transport,
    ) -> Option<ConnectionStatus> {
        self.reachability = reachability;
        self.evaluate(transport.is_connected())
    }

    /// Transport reported a handshake status.
    ///
    /// Returns the new status if it changed.
    pub fn on_transport_status(
        &mut self,
        status: TransportStatus,
        transport: &impl Transport,
    ) -> Option<ConnectionStatus> {
        let connected = status == TransportStatus::Connected || transport.is_connected();
        self.evaluate(connected)
    }

    fn evaluate(&mut self, transport_connected: bool) -> Option<ConnectionStatus> {
        let next = match (self.reachability, transport_connected) {
            (Reachability::Offline, _) => ConnectionStatus::Offline,
            (Reachability::Online, true) => ConnectionStatus::Connected,
            (Reachability::Online, false) => ConnectionStatus::Connecting,
        };
        if next == self.status {
            return None;
        }
        tracing::info!(from = ?self.status, to = ?next, "connection status changed");
        #[cfg(feature = "telemetry")]
        metrics::counter!("scribe_connection_transition_total").increment(1);
        self.status = next;
        Some(next)
    }
}
