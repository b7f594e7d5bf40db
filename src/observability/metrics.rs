//! Metrics collection for `degenscore`.
//!
//! Prometheus-compatible counters and histograms for sequencer runs and
//! connector calls. The macros no-op until [`init_metrics`] installs a
//! recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::DegenScoreError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length for user-supplied label values.
const MAX_LABEL_LEN: usize = 64;

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `DegenScoreError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), DegenScoreError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| DegenScoreError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "degenscore_sequences_started_total",
        "Sequencer runs started, by verification source"
    );
    describe_counter!(
        "degenscore_sequences_completed_total",
        "Sequencer runs that reached Done"
    );
    describe_counter!(
        "degenscore_sequences_cancelled_total",
        "Sequencer runs cancelled before Done"
    );
    describe_counter!(
        "degenscore_start_rejected_total",
        "Start calls rejected because a run was already live"
    );
    describe_counter!(
        "degenscore_stages_connected_total",
        "Flow stages recorded as connected"
    );
    describe_histogram!(
        "degenscore_stage_duration_ms",
        "Wall time from stage start to Done in milliseconds"
    );
    describe_counter!(
        "degenscore_connect_errors_total",
        "Connector failures by kind and provider"
    );
}

/// Records a sequencer start.
pub fn record_sequence_started(source: &'static str) {
    counter!("degenscore_sequences_started_total", "source" => source).increment(1);
}

/// Records a run reaching `Done`.
pub fn record_sequence_completed() {
    counter!("degenscore_sequences_completed_total").increment(1);
}

/// Records a run cancelled before `Done`.
pub fn record_sequence_cancelled() {
    counter!("degenscore_sequences_cancelled_total").increment(1);
}

/// Records a rejected overlapping start.
pub fn record_start_rejected() {
    counter!("degenscore_start_rejected_total").increment(1);
}

/// Records a stage completing, with its duration.
pub fn record_stage_connected(stage: &'static str, duration: Duration) {
    counter!("degenscore_stages_connected_total", "stage" => stage).increment(1);
    histogram!("degenscore_stage_duration_ms", "stage" => stage)
        .record(duration.as_secs_f64() * 1000.0);
}

/// Records a connector failure.
///
/// Provider ids come from the command line, so they are sanitized before
/// being used as a label.
pub fn record_connect_error(kind: &'static str, provider: &str) {
    counter!(
        "degenscore_connect_errors_total",
        "kind" => kind,
        "provider" => sanitize_label(provider)
    )
    .increment(1);
}

/// Truncates to [`MAX_LABEL_LEN`] characters and replaces characters that
/// are invalid in Prometheus labels with underscores.
fn sanitize_label(value: &str) -> String {
    value
        .chars()
        .take(MAX_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_simple_ids() {
        assert_eq!(sanitize_label("metamask"), "metamask");
        assert_eq!(sanitize_label("wallet-connect_v2"), "wallet-connect_v2");
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_label("evil provider{}"), "evil_provider__");
    }

    #[test]
    fn sanitize_truncates_long_values() {
        let long = "x".repeat(10_000);
        assert_eq!(sanitize_label(&long).len(), MAX_LABEL_LEN);
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_sequence_started("simulated");
        record_sequence_completed();
        record_sequence_cancelled();
        record_start_rejected();
        record_stage_connected("wallet", Duration::from_millis(6700));
        record_connect_error("rejected", "metamask");
    }
}
