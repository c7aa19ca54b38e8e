//! Telemetry infrastructure for scribe binaries.
//!
//! Provides:
//! - Tracing with compact console output
//! - Prometheus metrics (feature `telemetry`)
//!
//! # Usage
//!
//! ```ignore
//! use scribe_common::telemetry::{self, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env("scribe");
//!     telemetry::init(config);
//!
//!     tracing::info!("session opened");
//! }
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[cfg(feature = "telemetry")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "telemetry")]
use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling (e.g., "scribe")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
    /// Explicit filter directive; `RUST_LOG` still wins when set.
    pub filter: Option<String>,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
            filter: None,
        }
    }

    /// Use the given filter directive (e.g. `EditorConfig::log_level`).
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| match &self.filter {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::new(self.console_level.as_str().to_lowercase()),
        })
    }
}

/// Initialize telemetry (metrics + tracing).
///
/// Call once at application startup. Later calls are ignored.
pub fn init(config: TelemetryConfig) {
    #[cfg(feature = "telemetry")]
    init_metrics();

    init_tracing(config);
}

/// Initialize just the prometheus metrics recorder.
#[cfg(feature = "telemetry")]
pub fn init_metrics() -> &'static PrometheusHandle {
    handle()
}

fn init_tracing(config: TelemetryConfig) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(config.env_filter());

    match tracing_subscriber::registry().with(console_layer).try_init() {
        Ok(()) => tracing::debug!(service = %config.service_name, "telemetry initialized"),
        Err(e) => tracing::debug!(error = %e, "tracing subscriber already installed"),
    }
}

/// Get the prometheus handle.
#[cfg(feature = "telemetry")]
pub fn handle() -> &'static PrometheusHandle {
    PROMETHEUS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install prometheus recorder")
    })
}

/// Render metrics in prometheus text format.
#[cfg(feature = "telemetry")]
pub fn render() -> String {
    handle().render()
}
