//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversion jobs (outcomes, duration, jobs in flight)
//! - Encoded output volume

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by input format, output format and outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phono_conversions_total", "Total conversion jobs"),
        &["input", "output", "outcome"], // outcome: "success", "validation_failure", ...
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "phono_conversion_duration_seconds",
            "Duration of conversion jobs",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Conversion jobs currently running.
pub static CONVERSIONS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "phono_conversions_in_flight",
        "Number of conversion jobs currently running",
    )
    .unwrap()
});

// =============================================================================
// Output Metrics
// =============================================================================

/// Bytes of encoded output delivered, by format.
pub static OUTPUT_BYTES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("phono_output_bytes_total", "Total bytes of encoded output"),
        &["format"],
    )
    .unwrap()
});

/// Returns all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(CONVERSIONS_IN_FLIGHT.clone()),
        Box::new(OUTPUT_BYTES.clone()),
    ]
}
