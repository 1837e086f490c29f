use std::net::SocketAddr;

use metrics::{Unit, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use time::OffsetDateTime;

use crate::gateway::resource::Resource;

pub const CHANNEL_CONNECTED_METRIC: &str = "remora_push_channel_connected";
pub const LAST_UPDATE_METRIC: &str = "remora_last_update_timestamp_seconds";
pub const EVENTS_APPLIED_METRIC: &str = "remora_events_applied_total";
pub const WRITES_IGNORED_METRIC: &str = "remora_writes_ignored_total";
pub const POLL_FAILURES_METRIC: &str = "remora_poll_failures_total";

#[derive(Debug, Clone, Copy)]
pub struct MetricsRuntime {
    pub listen_addr: SocketAddr,
}

pub fn start_prometheus_exporter(listen_addr: SocketAddr) -> Result<MetricsRuntime, BuildError> {
    describe_gauge!(
        CHANNEL_CONNECTED_METRIC,
        Unit::Count,
        "1 while the push channel is connected, 0 otherwise."
    );
    describe_gauge!(
        LAST_UPDATE_METRIC,
        Unit::Seconds,
        "Unix timestamp of the latest applied snapshot per resource."
    );
    describe_counter!(
        EVENTS_APPLIED_METRIC,
        Unit::Count,
        "Push events merged into the view model, by tag."
    );
    describe_counter!(
        WRITES_IGNORED_METRIC,
        Unit::Count,
        "Writes discarded before merging (stale, duplicate), by reason."
    );
    describe_counter!(
        POLL_FAILURES_METRIC,
        Unit::Count,
        "Poll fallback fetches that soft-failed, by resource."
    );

    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()?;

    Ok(MetricsRuntime { listen_addr })
}

pub fn record_channel_state(connected: bool) {
    gauge!(CHANNEL_CONNECTED_METRIC).set(if connected { 1.0 } else { 0.0 });
}

pub fn record_snapshot_applied(resource: Resource, observed_at: OffsetDateTime) {
    gauge!(LAST_UPDATE_METRIC, "resource" => resource.name())
        .set(observed_at.unix_timestamp() as f64);
}

pub fn record_event_applied(tag: &'static str) {
    counter!(EVENTS_APPLIED_METRIC, "tag" => tag).increment(1);
}

pub fn record_write_ignored(reason: &'static str) {
    counter!(WRITES_IGNORED_METRIC, "reason" => reason).increment(1);
}

pub fn record_poll_failure(resource: Resource) {
    counter!(POLL_FAILURES_METRIC, "resource" => resource.name()).increment(1);
}
