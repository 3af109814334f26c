//! Metrics collection and exposition.
//!
//! # Metrics
//! - `logger_entries_total` (counter): entries accepted by a sink, by channel and sink
//! - `logger_entries_dropped_total` (counter): file entries dropped on a full queue
//! - `logger_write_failures_total` (counter): appends that failed with an I/O error
//! - `logger_archive_units_total` (counter): archive units by outcome
//! - `http_requests_total` (counter): responses by method and status
//! - `http_request_duration_seconds` (histogram): handler latency
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Prometheus exporter is optional and off by default

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::archive::ArchiveState;
use crate::observability::settings::{Channel, Sink};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_entry(channel: Channel, sink: Sink) {
    let sink = match sink {
        Sink::Console => "console",
        Sink::File => "file",
        Sink::Archive => "archive",
    };
    counter!("logger_entries_total", "channel" => channel.dir_name(), "sink" => sink).increment(1);
}

pub fn record_dropped(channel: Channel) {
    counter!("logger_entries_dropped_total", "channel" => channel.dir_name()).increment(1);
}

pub fn record_write_failure(channel: Channel) {
    counter!("logger_write_failures_total", "channel" => channel.dir_name()).increment(1);
}

pub fn record_archive(state: ArchiveState) {
    let outcome = match state {
        ArchiveState::Done => "done",
        ArchiveState::Failed => "failed",
        ArchiveState::Skipped(_) => "skipped",
        ArchiveState::Pending | ArchiveState::Compressing => return,
    };
    counter!("logger_archive_units_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}
