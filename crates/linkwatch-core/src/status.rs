use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FALLBACK_ERROR: &str = "Connection failed";

/// Point-in-time view of a monitor's connection, replaced wholesale on
/// every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            is_connected: false,
            is_loading: true,
            error: None,
            last_checked: None,
        }
    }
}

impl ConnectionStatus {
    pub(crate) fn loading(&self) -> Self {
        Self {
            is_loading: true,
            error: None,
            ..self.clone()
        }
    }

    pub(crate) fn connected(at: DateTime<Utc>, still_loading: bool) -> Self {
        Self {
            is_connected: true,
            is_loading: still_loading,
            error: None,
            last_checked: Some(at),
        }
    }

    pub(crate) fn disconnected(reason: String, at: DateTime<Utc>, still_loading: bool) -> Self {
        let reason = if reason.trim().is_empty() {
            FALLBACK_ERROR.to_string()
        } else {
            reason
        };

        Self {
            is_connected: false,
            is_loading: still_loading,
            error: Some(reason),
            last_checked: Some(at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    Uninitialized,
    Loading,
    Connected,
    Disconnected,
}

impl MonitorPhase {
    pub fn label(&self) -> &'static str {
        match self {
            MonitorPhase::Uninitialized => "uninitialized",
            MonitorPhase::Loading => "loading",
            MonitorPhase::Connected => "connected",
            MonitorPhase::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeStats {
    pub probes_started: u64,
    pub probes_ok: u64,
    pub probes_failed: u64,
    /// Scheduled probes dropped because the monitor was stopped first.
    pub probes_skipped: u64,
    pub last_rtt_ms: Option<u128>,
}

/// Body of a successful `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
