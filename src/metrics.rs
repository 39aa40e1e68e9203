// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter,
};

use std::time::Duration;

/// Initializes the descriptions for all the metrics in the application.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_gauge!("oracle_up", "Oracle process liveness (1=up).");

    // Monitor loop
    describe_counter!(
        "oracle_cycles_total",
        Unit::Count,
        "Total number of completed monitor cycles."
    );
    describe_histogram!(
        "oracle_cycle_duration_ms",
        "Wall time of one monitor cycle in milliseconds."
    );

    // Providers
    describe_counter!(
        "oracle_provider_requests_total",
        Unit::Count,
        "HTTP requests to data providers, labeled by provider and result (ok, error). Retries count once."
    );
    describe_histogram!(
        "oracle_provider_request_ms",
        "Provider request latency in milliseconds, retries included."
    );
    describe_counter!(
        "oracle_provider_fetch_total",
        Unit::Count,
        "Provider fetches seen by the monitor, labeled by provider and result (ok, unavailable, not_found, malformed, rejected)."
    );
    describe_counter!(
        "oracle_provider_malformed_records_total",
        Unit::Count,
        "Records dropped during normalization, labeled by provider."
    );

    // Consensus and settlement
    describe_counter!(
        "oracle_consensus_total",
        Unit::Count,
        "Consensus evaluations, labeled by result (reached, deferred)."
    );
    describe_counter!(
        "oracle_submissions_total",
        Unit::Count,
        "Settlement submissions, labeled by result (confirmed, transient, rejected, already_finalized)."
    );
    describe_gauge!(
        "oracle_ledger_size",
        "Number of matches in the processed ledger."
    );

    gauge!("oracle_up", 1.0);
}

pub fn record_provider_request(provider: &str, duration: Duration, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("oracle_provider_requests_total", 1, "provider" => provider.to_string(), "result" => result);
    histogram!("oracle_provider_request_ms", duration.as_millis() as f64, "provider" => provider.to_string());
}

pub fn increment_malformed_records(provider: &str, count: u64) {
    counter!("oracle_provider_malformed_records_total", count, "provider" => provider.to_string());
}

pub fn record_provider_fetch(provider: &str, result: &'static str) {
    increment_counter!("oracle_provider_fetch_total", "provider" => provider.to_string(), "result" => result);
}

pub fn record_cycle(duration: Duration) {
    increment_counter!("oracle_cycles_total");
    histogram!("oracle_cycle_duration_ms", duration.as_millis() as f64);
}

pub fn record_consensus(reached: bool) {
    let result = if reached { "reached" } else { "deferred" };
    increment_counter!("oracle_consensus_total", "result" => result);
}

pub fn record_submission(result: &'static str) {
    increment_counter!("oracle_submissions_total", "result" => result);
}

pub fn set_ledger_size(size: usize) {
    gauge!("oracle_ledger_size", size as f64);
}

/// Starts the Prometheus scrape endpoint on `0.0.0.0:port`.
#[cfg(feature = "observability")]
pub fn install_prometheus_exporter(port: u16) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    describe_metrics();
    log::info!("📈 Prometheus exporter listening on 0.0.0.0:{}", port);
    Ok(())
}

#[cfg(not(feature = "observability"))]
pub fn install_prometheus_exporter(port: u16) -> anyhow::Result<()> {
    log::warn!(
        "metrics.prometheus_port = {} ignored: built without the `observability` feature",
        port
    );
    Ok(())
}
