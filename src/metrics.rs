use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with its own HTTP listener
pub fn init_metrics(listen_address: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen_address)
        .install()?;

    init_metric_descriptions();

    Ok(())
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "productinfo_renewals_total",
        "Total number of provider renewals by outcome"
    );
    describe_histogram!(
        "productinfo_renewal_duration_seconds",
        "Provider renewal duration in seconds"
    );
    describe_counter!(
        "productinfo_renewals_skipped_total",
        "Renewal triggers dropped because the provider was still refreshing"
    );
    describe_counter!(
        "productinfo_records_skipped_total",
        "Billing records skipped during price ingestion"
    );
    describe_gauge!("productinfo_info", "Product info version information");

    gauge!("productinfo_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a finished renewal; `status` is "success" or "failure"
pub fn record_renewal(provider: &str, status: &str, duration: Duration) {
    counter!(
        "productinfo_renewals_total",
        "provider" => provider.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    histogram!(
        "productinfo_renewal_duration_seconds",
        "provider" => provider.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a renewal trigger dropped while one was in flight
pub fn record_renewal_skipped(provider: &str) {
    counter!(
        "productinfo_renewals_skipped_total",
        "provider" => provider.to_string(),
    )
    .increment(1);
}

/// Record a billing record skipped during ingestion
pub fn record_skipped_record(provider: &str, reason: &str) {
    counter!(
        "productinfo_records_skipped_total",
        "provider" => provider.to_string(),
        "reason" => reason.to_string(),
    )
    .increment(1);
}
