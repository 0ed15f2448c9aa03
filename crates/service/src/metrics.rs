use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "template_registry_uploads_total",
        "Templates stored successfully",
        &["category"]
    )
    .expect("register uploads_total")
});

pub static UPLOAD_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "template_registry_upload_failures_total",
        "Store requests rejected or failed",
        &["reason"]
    )
    .expect("register upload_failures_total")
});

pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "template_registry_downloads_total",
        "Template files opened for download",
        &["category"]
    )
    .expect("register downloads_total")
});

pub static ROLLBACKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "template_registry_rollbacks_total",
        "Uploaded files removed after a metadata save failure"
    )
    .expect("register rollbacks_total")
});

pub static ORPHANS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "template_registry_orphans_total",
        "Uploaded files left on disk because rollback failed"
    )
    .expect("register orphans_total")
});

/// Render the default registry in the Prometheus text format.
pub fn encode_metrics() -> Result<String, String> {
    // touch the statics so the families show up before the first request
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&UPLOAD_FAILURES_TOTAL);
    Lazy::force(&DOWNLOADS_TOTAL);
    Lazy::force(&ROLLBACKS_TOTAL);
    Lazy::force(&ORPHANS_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("metrics encode error: {e}"))?;
    String::from_utf8(buffer).map_err(|e| format!("metrics encode error: {e}"))
}
