//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::Local;
use tempfile::TempDir;
use tower::ServiceExt;

use api_telemetry::config::{AppConfig, LoggingConfig};
use api_telemetry::lifecycle::start_logger_with_clock;
use api_telemetry::observability::{Channel, ChannelRouter, Clock, LogFile, LoggerSettings, SystemClock};

/// A logger writing into its own temporary directory.
pub struct TestLogger {
    pub dir: TempDir,
    pub router: ChannelRouter,
}

impl TestLogger {
    pub async fn start(code: &str) -> Self {
        Self::start_with_clock(code, Arc::new(SystemClock)).await
    }

    pub async fn start_with_clock(code: &str, clock: Arc<dyn Clock>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(LoggerSettings::parse(code, false).unwrap());
        let router = start_logger_with_clock(&logging_config(dir.path()), settings, clock)
            .await
            .unwrap();
        Self { dir, router }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            logging: logging_config(self.dir.path()),
            ..AppConfig::default()
        }
    }

    pub fn channel_dir(&self, channel: Channel) -> PathBuf {
        self.dir.path().join(channel.dir_name())
    }

    /// Today's file of `channel` by the system clock.
    pub fn today_file(&self, channel: Channel) -> PathBuf {
        LogFile::resolve(self.dir.path(), channel, Local::now().date_naive()).path
    }

    /// Content of today's file, empty when it does not exist.
    pub async fn read_today(&self, channel: Channel) -> String {
        self.router.flush().await;
        std::fs::read_to_string(self.today_file(channel)).unwrap_or_default()
    }
}

pub fn logging_config(dir: &Path) -> LoggingConfig {
    LoggingConfig {
        log_dir: dir.to_string_lossy().into_owned(),
        ..LoggingConfig::default()
    }
}

/// Entry lines of a brief file (header and blank lines dropped).
pub fn brief_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.is_empty() && !l.starts_with("#===#"))
        .map(str::to_string)
        .collect()
}

/// Bodies of a multi-line channel file, one per `#--# time #--#` delimiter.
pub fn entries(text: &str) -> Vec<String> {
    text.split("#--# ")
        .skip(1)
        .filter_map(|chunk| chunk.split_once(" #--#\n"))
        .map(|(_, body)| body.trim_end_matches('\n').to_string())
        .collect()
}

/// Request-channel documents parsed back from YAML.
pub fn trace_documents(text: &str) -> Vec<serde_yaml::Value> {
    entries(text)
        .iter()
        .map(|doc| serde_yaml::from_str(doc).unwrap())
        .collect()
}

/// Send `req` through `app` and read the whole body, so close callbacks fire.
pub async fn send(app: &Router, req: Request<Body>) -> (u16, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Parse `"12.34ms"` into milliseconds.
pub fn parse_ms(value: &str) -> f64 {
    value.trim_end_matches("ms").parse().unwrap()
}
