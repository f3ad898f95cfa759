use std::net::SocketAddr;

use crate::command::SlotCommand;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: boundary commands applied. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "parkway_commands_total";

/// Counter: sensor reports. Labels: outcome (occupied, vacated, ignored, unchanged, unknown_slot).
pub const SENSOR_EVENTS_TOTAL: &str = "parkway_sensor_events_total";

/// Counter: reservation requests. Labels: outcome (accepted, refreshed,
/// slot_unavailable, invalid_input, unknown_slot).
pub const RESERVATION_REQUESTS_TOTAL: &str = "parkway_reservation_requests_total";

/// Counter: release requests. Labels: outcome (released, noop, unknown_slot).
pub const RELEASES_TOTAL: &str = "parkway_releases_total";

/// Histogram: time spent inside a mutating operation, lock wait included, rejected
/// calls too. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "parkway_operation_duration_seconds";

// ── USE metrics (state) ─────────────────────────────────────────

/// Counter: reservations reverted to FREE by expiry.
pub const RESERVATIONS_EXPIRED_TOTAL: &str = "parkway_reservations_expired_total";

/// Gauge: slots per status, refreshed whenever stats are computed. Labels: status.
pub const SLOTS: &str = "parkway_slots";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a SlotCommand variant to a short label for metrics.
pub fn command_label(cmd: &SlotCommand) -> &'static str {
    match cmd {
        SlotCommand::Sensor { .. } => "report_sensor",
        SlotCommand::Reserve { .. } => "request_reservation",
        SlotCommand::Release => "release_reservation",
    }
}
