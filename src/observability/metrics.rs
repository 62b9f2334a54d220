//! Metrics for the extraction pipeline.
//!
//! Records through the `metrics` facade using standard Prometheus naming
//! conventions. Runs are short-lived, so the registry can be pushed to a
//! Pushgateway once at the end instead of being scraped.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Enum representing all metric names used in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Fetch metrics
    FetchRequestsSuccess,
    FetchRequestsError,
    FetchRequestDuration,
    FetchPayloadBytes,

    // Normalize metrics
    NormalizeRecordsEmitted,
    NormalizeRecordsDropped,

    // Encode metrics
    EncodeArtifactBytes,
    EncodeFallbacks,

    // Sink metrics
    SinkWritesSuccess,
    SinkWritesError,
    SinkPutDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchRequestsSuccess => "udx_fetch_requests_success_total",
            MetricName::FetchRequestsError => "udx_fetch_requests_error_total",
            MetricName::FetchRequestDuration => "udx_fetch_request_duration_seconds",
            MetricName::FetchPayloadBytes => "udx_fetch_payload_bytes",

            MetricName::NormalizeRecordsEmitted => "udx_normalize_records_emitted_total",
            MetricName::NormalizeRecordsDropped => "udx_normalize_records_dropped_total",

            MetricName::EncodeArtifactBytes => "udx_encode_artifact_bytes",
            MetricName::EncodeFallbacks => "udx_encode_fallback_total",

            MetricName::SinkWritesSuccess => "udx_sink_writes_success_total",
            MetricName::SinkWritesError => "udx_sink_writes_error_total",
            MetricName::SinkPutDuration => "udx_sink_put_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct MetricsState {
    handle: metrics_exporter_prometheus::PrometheusHandle,
    pushgateway_url: String,
    job: String,
    instance: String,
}

// Global state for end-of-run pushing
static METRICS_HANDLE: OnceLock<Arc<MetricsState>> = OnceLock::new();

/// Initialize the metrics system with optional push gateway support
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_push_options(None, None)
}

/// Initialize with push gateway configuration
pub fn init_with_push_options(
    job_name: Option<&str>,
    instance: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    // If a push gateway is configured, keep the handle for push_all_metrics
    if let Ok(pushgateway_url) = std::env::var("UDX_PUSHGATEWAY_URL") {
        let job = job_name.unwrap_or("userdir_extractor");
        let inst = instance.unwrap_or("default");

        METRICS_HANDLE
            .set(Arc::new(MetricsState {
                handle,
                pushgateway_url,
                job: job.to_string(),
                instance: inst.to_string(),
            }))
            .ok();

        info!("Metrics system initialized with push gateway support");
    } else {
        info!("Metrics system initialized (no push gateway)");
    }

    Ok(())
}

/// Push the rendered registry to the Pushgateway. A no-op when no gateway is
/// configured; callers treat failures as best-effort.
pub async fn push_all_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let state = match METRICS_HANDLE.get() {
        Some(state) => state,
        None => return Ok(()),
    };

    let push_url = format!(
        "{}/metrics/job/{}/instance/{}",
        state.pushgateway_url.trim_end_matches('/'),
        state.job,
        state.instance
    );

    let client = reqwest::Client::new();
    let response = client
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(state.handle.render())
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(format!("Pushgateway returned status: {}", response.status()).into());
    }

    info!("Pushed metrics to Pushgateway for instance={}", state.instance);
    Ok(())
}

// ============================================================================
// Fetch Metrics
// ============================================================================

pub mod fetch {
    use super::MetricName;

    /// Record a successful request
    pub fn request_success() {
        ::metrics::counter!(MetricName::FetchRequestsSuccess.as_str()).increment(1);
    }

    /// Record a failed request
    pub fn request_error() {
        ::metrics::counter!(MetricName::FetchRequestsError.as_str()).increment(1);
    }

    /// Record request duration
    pub fn request_duration(secs: f64) {
        ::metrics::histogram!(MetricName::FetchRequestDuration.as_str()).record(secs);
    }

    /// Record payload size
    pub fn payload_bytes(bytes: usize) {
        ::metrics::histogram!(MetricName::FetchPayloadBytes.as_str()).record(bytes as f64);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    /// Record records that survived normalization
    pub fn records_emitted(count: u64) {
        ::metrics::counter!(MetricName::NormalizeRecordsEmitted.as_str()).increment(count);
    }

    /// Record records dropped during normalization
    pub fn records_dropped(count: u64) {
        ::metrics::counter!(MetricName::NormalizeRecordsDropped.as_str()).increment(count);
    }
}

// ============================================================================
// Encode Metrics
// ============================================================================

pub mod encode {
    use super::MetricName;

    /// Record encoded artifact size for a format
    pub fn artifact_bytes(format: &str, bytes: usize) {
        ::metrics::histogram!(MetricName::EncodeArtifactBytes.as_str(), "format" => format.to_string())
            .record(bytes as f64);
    }

    /// Record a columnar-to-NDJSON fallback
    pub fn fallback() {
        ::metrics::counter!(MetricName::EncodeFallbacks.as_str()).increment(1);
    }
}

// ============================================================================
// Sink Metrics
// ============================================================================

pub mod sink {
    use super::MetricName;

    /// Record a successful object write for a format
    pub fn write_success(format: &str) {
        ::metrics::counter!(MetricName::SinkWritesSuccess.as_str(), "format" => format.to_string())
            .increment(1);
    }

    /// Record a failed object write for a format
    pub fn write_error(format: &str) {
        ::metrics::counter!(MetricName::SinkWritesError.as_str(), "format" => format.to_string())
            .increment(1);
    }

    /// Record put duration
    pub fn put_duration(secs: f64) {
        ::metrics::histogram!(MetricName::SinkPutDuration.as_str()).record(secs);
    }
}
