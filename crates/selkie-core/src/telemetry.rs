//! Telemetry initialization for Selkie
//!
//! Structured logging through `tracing`, configured once at process start.
//! Metric recording lives in [`crate::metrics`] and is feature-gated; log
//! output is always available.

use crate::error::{Error, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,selkie_core=debug,selkie_runtime=debug";

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported in logs
    pub service_name: String,
    /// Log filter directive, `RUST_LOG` syntax
    pub log_filter: String,
    /// Emit human-readable logs to stdout
    pub stdout_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "selkie".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            stdout_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a config with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log filter directive
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Disable stdout log output
    pub fn without_stdout(mut self) -> Self {
        self.stdout_enabled = false;
        self
    }

    /// Build a config from the environment
    ///
    /// Reads `SELKIE_SERVICE_NAME` and `RUST_LOG`, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = std::env::var("SELKIE_SERVICE_NAME") {
            if !name.is_empty() {
                config.service_name = name;
            }
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.is_empty() {
                config.log_filter = filter;
            }
        }
        config
    }
}

/// Guard returned by [`init_telemetry`]
///
/// Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    _private: (),
}

/// Initialize the global tracing subscriber
///
/// Call once at process start; a second call fails because the global
/// subscriber is already set.
///
/// # Errors
/// Returns `Error::Internal` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| Error::internal(format!("invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.stdout_enabled {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| Error::internal(format!("failed to init telemetry: {}", e)))?;
    } else {
        registry
            .try_init()
            .map_err(|e| Error::internal(format!("failed to init telemetry: {}", e)))?;
    }

    info!(service_name = %config.service_name, "Telemetry initialized");
    Ok(TelemetryGuard { _private: () })
}
