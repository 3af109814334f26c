//! Logger startup.
//!
//! # Responsibilities
//! - Create the directories of file and archive channels
//! - Archive files left over from previous days before the first write
//! - Start the channel router and its writer tasks
//!
//! # Design Decisions
//! - Fail fast: an unusable log directory is fatal
//! - Startup archival is awaited; the server binds only afterwards

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;

use crate::config::LoggingConfig;
use crate::observability::{Archiver, ChannelRouter, Clock, FileWriter, LoggerSettings, SystemClock};

pub async fn start_logger(
    config: &LoggingConfig,
    settings: Arc<LoggerSettings>,
) -> io::Result<ChannelRouter> {
    start_logger_with_clock(config, settings, Arc::new(SystemClock)).await
}

pub async fn start_logger_with_clock(
    config: &LoggingConfig,
    settings: Arc<LoggerSettings>,
    clock: Arc<dyn Clock>,
) -> io::Result<ChannelRouter> {
    let log_dir = PathBuf::from(&config.log_dir);

    for channel in settings.channels().filter(|c| c.sinks.file || c.sinks.archive) {
        fs::create_dir_all(log_dir.join(channel.channel.dir_name())).await?;
    }

    let archiver = Archiver::new(&log_dir, settings.clone(), clock.clone(), config.compression_level);
    let report = archiver.archive_all().await;
    tracing::info!(
        archived = report.done(),
        failed = report.failed(),
        skipped = report.skipped(),
        "Startup archival finished"
    );

    let writer = Arc::new(FileWriter::new(&log_dir, clock.clone(), archiver));
    let router = ChannelRouter::start_with_clock(settings, writer, config.queue_capacity, clock);

    tracing::info!(
        log_dir = %log_dir.display(),
        settings = %router.settings().raw(),
        "Logger started"
    );
    Ok(router)
}
