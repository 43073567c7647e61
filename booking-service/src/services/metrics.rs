use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Safe to call once per process.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics handle already initialized"))
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_booking_created(currency: &str) {
    counter!("bookings_created_total", "currency" => currency.to_string()).increment(1);
}

/// A booking or order was deleted after its authorization failed.
pub fn record_compensation(kind: &'static str) {
    counter!("bookings_compensated_total", "kind" => kind).increment(1);
}

pub fn record_payment_event(event_type: &str, outcome: &'static str) {
    counter!(
        "payment_events_total",
        "type" => event_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_cascade_failure(step: &'static str) {
    counter!("payment_cascade_failures_total", "step" => step).increment(1);
}
