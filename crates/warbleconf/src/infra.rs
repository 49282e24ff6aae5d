//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};

/// Network addresses for the OSC control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// UDP address the daemon listens on for OSC control messages.
    /// Default: 0.0.0.0:8000
    #[serde(default = "BindConfig::default_listen")]
    pub listen: String,

    /// UDP address echoed and generated notes are sent to.
    /// Default: 127.0.0.1:8001
    #[serde(default = "BindConfig::default_peer")]
    pub peer: String,
}

impl BindConfig {
    fn default_listen() -> String {
        "0.0.0.0:8000".to_string()
    }

    fn default_peer() -> String {
        "127.0.0.1:8001".to_string()
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            listen: Self::default_listen(),
            peer: Self::default_peer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or RUST_LOG syntax).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// All infrastructure configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
