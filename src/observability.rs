use std::net::SocketAddr;

use crate::command::Command;
use crate::engine::RejectReason;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: input commands processed. Labels: command.
pub const COMMANDS_TOTAL: &str = "maitre_commands_total";

/// Counter: availability fetches completed. Labels: status
/// (applied | stale | failed).
pub const FETCHES_TOTAL: &str = "maitre_fetches_total";

/// Histogram: availability fetch latency in seconds.
pub const FETCH_DURATION_SECONDS: &str = "maitre_fetch_duration_seconds";

/// Counter: selection mutations rejected. Labels: reason.
pub const SELECTION_REJECTIONS_TOTAL: &str = "maitre_selection_rejections_total";

/// Counter: reservation submissions. Labels: status (ok | error | transport).
pub const SUBMITS_TOTAL: &str = "maitre_submits_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: availability queries currently in flight.
pub const FETCHES_IN_FLIGHT: &str = "maitre_fetches_in_flight";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::DateChanged { .. } => "date_changed",
        Command::PartySizeChanged { .. } => "party_size_changed",
        Command::DurationChanged { .. } => "duration_changed",
        Command::TimeChosen { .. } => "time_chosen",
        Command::TableToggled { .. } => "table_toggled",
        Command::SelectionCleared => "selection_cleared",
        Command::SubmitRequested { .. } => "submit_requested",
        Command::WidgetReset => "widget_reset",
    }
}

/// Map a rejection to a short label for metrics.
pub fn reject_label(reason: &RejectReason) -> &'static str {
    match reason {
        RejectReason::LimitExceeded { .. } => "limit_exceeded",
        RejectReason::CapacityMismatch { .. } => "capacity_mismatch",
        RejectReason::NoLongerAvailable { .. } => "no_longer_available",
    }
}
