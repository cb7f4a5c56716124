use chrono::{DateTime, Utc};
use linkwatch_core::{ConnectionStatus, MonitorPhase, ProbeStats};

pub fn to_json(status: &ConnectionStatus, phase: MonitorPhase, stats: &ProbeStats) -> serde_json::Value {
    serde_json::json!({
        "phase": phase,
        "status": status,
        "stats": stats,
    })
}

pub fn format_checked(at: Option<DateTime<Utc>>) -> String {
    at.map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// One-line summary shown by both the watch output and the status panel.
pub fn headline(status: &ConnectionStatus) -> String {
    if status.is_loading {
        let previous = match (status.last_checked, status.is_connected) {
            (None, _) => "first check",
            (Some(_), true) => "was connected",
            (Some(_), false) => "was disconnected",
        };
        return format!("Checking connection... ({previous})");
    }

    match (&status.error, status.is_connected) {
        (_, true) => format!("Connected, last checked {}", format_checked(status.last_checked)),
        (Some(error), false) => format!("Disconnected: {error}"),
        (None, false) => "Disconnected".to_string(),
    }
}

pub fn human_lines(status: &ConnectionStatus, phase: MonitorPhase, stats: &ProbeStats) -> Vec<String> {
    let mut lines = vec![
        "=== Backend Connectivity ===".to_string(),
        format!("Time:       {}", Utc::now().to_rfc3339()),
        format!("State:      {} ({})", phase.label(), headline(status)),
        format!("Checked:    {}", format_checked(status.last_checked)),
    ];

    if let Some(error) = &status.error {
        lines.push(format!("Error:      {error}"));
        lines.push("Retry:      run `linkwatch check` or press 'r' in `linkwatch view`".to_string());
    }

    lines.push(format!(
        "Probes:     started={} ok={} failed={} rtt_ms={}",
        stats.probes_started,
        stats.probes_ok,
        stats.probes_failed,
        stats
            .last_rtt_ms
            .map(|ms| ms.to_string())
            .unwrap_or_else(|| "n/a".to_string()),
    ));

    lines
}
