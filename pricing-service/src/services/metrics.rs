//! Metrics module for pricing-service.
//! Provides Prometheus metrics for resolutions, cache behaviour and rule changes.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "pricing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Resolutions by winning base tier and extras tier
pub static RESOLUTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Degraded resolutions (store unreadable)
pub static DEGRADED_RESOLUTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Resolution duration histogram
pub static RESOLUTION_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Cache lookups by outcome
pub static CACHE_LOOKUPS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Rule mutations by entity, action and outcome
pub static RULE_MUTATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup; later calls are no-ops.
pub fn init_metrics() {
    RESOLUTIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_resolutions_total",
                "Total fee resolutions by base tier and extras tier"
            ),
            &["base_tier", "extras_tier"]
        )
        .expect("Failed to register RESOLUTIONS_TOTAL")
    });

    DEGRADED_RESOLUTIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_degraded_resolutions_total",
                "Resolutions that fell back to the last known global default"
            ),
            &["cause"]
        )
        .expect("Failed to register DEGRADED_RESOLUTIONS_TOTAL")
    });

    RESOLUTION_DURATION.get_or_init(|| {
        register_histogram_vec!(
            histogram_opts!(
                "pricing_resolution_duration_seconds",
                "Fee resolution duration",
                vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
            ),
            &["cached"]
        )
        .expect("Failed to register RESOLUTION_DURATION")
    });

    CACHE_LOOKUPS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("pricing_cache_lookups_total", "Resolution cache lookups"),
            &["outcome"]
        )
        .expect("Failed to register CACHE_LOOKUPS_TOTAL")
    });

    RULE_MUTATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_rule_mutations_total",
                "Pricing rule mutations by entity, action and outcome"
            ),
            &["entity", "action", "outcome"]
        )
        .expect("Failed to register RULE_MUTATIONS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("pricing_errors_total", "Total errors by type for alerting"),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a completed resolution.
pub fn record_resolution(base_tier: &str, extras_tier: &str) {
    if let Some(counter) = RESOLUTIONS_TOTAL.get() {
        counter.with_label_values(&[base_tier, extras_tier]).inc();
    }
}

/// Record a degraded resolution.
pub fn record_degraded_resolution(cause: &str) {
    if let Some(counter) = DEGRADED_RESOLUTIONS_TOTAL.get() {
        counter.with_label_values(&[cause]).inc();
    }
}

/// Record resolution duration.
pub fn record_resolution_duration(cached: bool, duration_secs: f64) {
    if let Some(histogram) = RESOLUTION_DURATION.get() {
        let label = if cached { "true" } else { "false" };
        histogram.with_label_values(&[label]).observe(duration_secs);
    }
}

/// Record a cache lookup (`hit` or `miss`).
pub fn record_cache_lookup(outcome: &str) {
    if let Some(counter) = CACHE_LOOKUPS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a rule mutation attempt.
pub fn record_rule_mutation(entity: &str, action: &str, outcome: &str) {
    if let Some(counter) = RULE_MUTATIONS_TOTAL.get() {
        counter.with_label_values(&[entity, action, outcome]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
