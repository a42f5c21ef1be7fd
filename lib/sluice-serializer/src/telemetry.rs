use metrics::counter;

use crate::{forwarder::Endpoint, marshaler::TelemetryKind};

/// Tracks payloads handed off to a forwarder.
pub fn track_submitted(kind: TelemetryKind, endpoint: Endpoint, payload_count: usize, payload_bytes: usize) {
    counter!(
        "serializer_payloads_submitted_total",
        "kind" => kind.as_str(),
        "endpoint" => endpoint.name()
    )
    .increment(payload_count as u64);
    counter!(
        "serializer_bytes_submitted_total",
        "kind" => kind.as_str(),
        "endpoint" => endpoint.name()
    )
    .increment(payload_bytes as u64);
}

/// Tracks a send that failed at the given stage.
pub fn track_failed(kind: TelemetryKind, stage: &'static str) {
    counter!(
        "serializer_send_failures_total",
        "kind" => kind.as_str(),
        "stage" => stage
    )
    .increment(1);
}
