/// Metrics and telemetry for the moderation service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Moderation actions by kind, action and outcome
/// - Bulk batch sizes and failures
/// - Background sweep executions

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // ========== Moderation Metrics ==========

    /// Moderation actions by entity kind, action and outcome
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_actions_total",
        "Total number of moderation actions",
        &["target_type", "action_type", "outcome"]
    )
    .unwrap();

    /// Entities per bulk action
    pub static ref BULK_BATCH_SIZE: HistogramVec = register_histogram_vec!(
        "moderation_bulk_batch_size",
        "Number of entities selected per bulk action",
        &["action_type"],
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    )
    .unwrap();

    /// Bulk items that failed, by error code
    pub static ref BULK_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_bulk_failures_total",
        "Total number of bulk action items that failed",
        &["action_type", "error"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a single moderation action
pub fn record_moderation_action(target_type: &str, action_type: &str, outcome: &str) {
    MODERATION_ACTIONS_TOTAL
        .with_label_values(&[target_type, action_type, outcome])
        .inc();
}

/// Record a bulk action and its per-item failures
pub fn record_bulk_action<'a>(
    action_type: &str,
    batch_size: usize,
    failure_codes: impl IntoIterator<Item = &'a str>,
) {
    BULK_BATCH_SIZE
        .with_label_values(&[action_type])
        .observe(batch_size as f64);
    for code in failure_codes {
        BULK_FAILURES_TOTAL
            .with_label_values(&[action_type, code])
            .inc();
    }
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}
