//! Metrics and observability utilities
//!
//! Provides metrics-rs counters, gauges and histograms with standardized
//! naming conventions for the ask and ingestion pipelines.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all PaperDesk metrics
pub const METRICS_PREFIX: &str = "paperdesk";

/// Register all metric descriptions
pub fn register_metrics() {
    // Ask metrics
    describe_counter!(
        format!("{}_asks_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ask requests"
    );

    describe_histogram!(
        format!("{}_answer_citations", METRICS_PREFIX),
        Unit::Count,
        "Citations attached to each synthesized answer"
    );

    describe_counter!(
        format!("{}_chunks_emitted_total", METRICS_PREFIX),
        Unit::Count,
        "Total stream chunks delivered to consumers"
    );

    describe_counter!(
        format!("{}_streams_cancelled_total", METRICS_PREFIX),
        Unit::Count,
        "Chunk streams cancelled before completion"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_ingestion_events_total", METRICS_PREFIX),
        Unit::Count,
        "Ingestion progress events emitted"
    );

    describe_counter!(
        format!("{}_ingestions_cancelled_total", METRICS_PREFIX),
        Unit::Count,
        "Ingestions cancelled before indexing"
    );

    describe_gauge!(
        format!("{}_ingest_subscribers", METRICS_PREFIX),
        Unit::Count,
        "Registered ingestion progress listeners"
    );

    tracing::info!("Metrics registered");
}

/// Record a synthesized answer
pub fn record_ask(mode: &str, citation_count: usize) {
    counter!(
        format!("{}_asks_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_answer_citations", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(citation_count as f64);
}

/// Record one chunk handed to a stream consumer
pub fn record_chunk(kind: &'static str) {
    counter!(
        format!("{}_chunks_emitted_total", METRICS_PREFIX),
        "type" => kind
    )
    .increment(1);
}

pub fn record_stream_cancelled() {
    counter!(format!("{}_streams_cancelled_total", METRICS_PREFIX)).increment(1);
}

/// Record an ingestion progress event
pub fn record_ingestion_event(status: &str) {
    counter!(
        format!("{}_ingestion_events_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_ingestion_cancelled() {
    counter!(format!("{}_ingestions_cancelled_total", METRICS_PREFIX)).increment(1);
}

/// Track the number of registered ingestion listeners
pub fn set_ingest_subscribers(count: usize) {
    gauge!(format!("{}_ingest_subscribers", METRICS_PREFIX)).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls must be no-ops
        register_metrics();
        record_ask("qa", 2);
        record_chunk("token");
        record_stream_cancelled();
        record_ingestion_event("indexed");
        record_ingestion_cancelled();
        set_ingest_subscribers(3);
    }
}
