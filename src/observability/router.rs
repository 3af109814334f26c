//! Channel fan-out.
//!
//! # Data Flow
//! ```text
//! route(channel, body)
//!     → disabled channel: return
//!     → console sink: tracing event under the channel's target
//!     → file sink: bounded queue → writer task → FileWriter::write
//! ```
//!
//! # Design Decisions
//! - Callers never wait on I/O; a full queue drops the entry
//! - One writer task per file channel keeps that channel's appends in order
//! - Write failures are counted and swallowed

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot};

use crate::observability::clock::{Clock, SystemClock};
use crate::observability::metrics;
use crate::observability::settings::{
    Channel, ChannelSettings, LoggerSettings, Sink, BRIEF_TARGET, ERROR_TARGET, FRAMEWORK_TARGET,
    REQUEST_TARGET,
};
use crate::observability::writer::FileWriter;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A single log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub channel: Channel,
    pub timestamp: DateTime<Local>,
    pub body: String,
}

enum Command {
    Write(LogEntry),
    Flush(oneshot::Sender<()>),
}

struct RouterInner {
    settings: Arc<LoggerSettings>,
    clock: Arc<dyn Clock>,
    queues: [Option<mpsc::Sender<Command>>; 4],
}

/// Routes entries of a channel to its configured sinks.
#[derive(Clone)]
pub struct ChannelRouter {
    inner: Arc<RouterInner>,
}

impl std::fmt::Debug for ChannelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRouter")
            .field("settings", &self.inner.settings.raw())
            .finish()
    }
}

impl ChannelRouter {
    /// Spawn one writer task per file-enabled channel. Needs a tokio runtime.
    pub fn start(settings: Arc<LoggerSettings>, writer: Arc<FileWriter>, capacity: usize) -> Self {
        Self::start_with_clock(settings, writer, capacity, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        settings: Arc<LoggerSettings>,
        writer: Arc<FileWriter>,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queues = Channel::ALL.map(|channel| {
            if !settings.channel(channel).fires(Sink::File) {
                return None;
            }
            let (tx, rx) = mpsc::channel(capacity.max(1));
            tokio::spawn(drain(channel, rx, writer.clone()));
            Some(tx)
        });

        Self {
            inner: Arc::new(RouterInner {
                settings,
                clock,
                queues,
            }),
        }
    }

    /// A router with every channel disabled.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                settings: Arc::new(LoggerSettings::disabled()),
                clock: Arc::new(SystemClock),
                queues: [None, None, None, None],
            }),
        }
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.inner.settings
    }

    pub fn channel(&self, channel: Channel) -> &ChannelSettings {
        self.inner.settings.channel(channel)
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.channel(channel).enabled
    }

    /// True when routing to `channel` would reach a console or a file.
    pub fn is_active(&self, channel: Channel) -> bool {
        self.channel(channel).is_active()
    }

    /// Dispatch `body` to the sinks of `channel`. Never blocks.
    pub fn route(&self, channel: Channel, body: impl Into<String>) {
        if !self.is_active(channel) {
            return;
        }
        self.route_entry(LogEntry {
            channel,
            timestamp: self.inner.clock.now(),
            body: body.into(),
        });
    }

    pub fn route_entry(&self, entry: LogEntry) {
        let settings = *self.channel(entry.channel);
        if !settings.enabled {
            return;
        }

        if settings.sinks.console {
            print_console(&entry);
            metrics::record_entry(entry.channel, Sink::Console);
        }

        if settings.sinks.file {
            let channel = entry.channel;
            if let Some(queue) = &self.inner.queues[channel.index()] {
                match queue.try_send(Command::Write(entry)) {
                    Ok(()) => metrics::record_entry(channel, Sink::File),
                    Err(_) => metrics::record_dropped(channel),
                }
            }
        }
    }

    /// Wait until every entry queued before this call has been written.
    pub async fn flush(&self) {
        for queue in self.inner.queues.iter().flatten() {
            let (tx, rx) = oneshot::channel();
            if queue.send(Command::Flush(tx)).await.is_ok() {
                let _ = rx.await;
            }
        }
    }
}

fn print_console(entry: &LogEntry) {
    match entry.channel {
        Channel::Brief => tracing::info!(target: BRIEF_TARGET, "{}", entry.body),
        Channel::Error => tracing::error!(target: ERROR_TARGET, "{}", entry.body),
        Channel::Request => tracing::info!(target: REQUEST_TARGET, "\n{}", entry.body),
        Channel::FrameworkDebug => tracing::debug!(target: FRAMEWORK_TARGET, "{}", entry.body),
    }
}

async fn drain(channel: Channel, mut rx: mpsc::Receiver<Command>, writer: Arc<FileWriter>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write(entry) => {
                if let Err(e) = writer.write(&entry).await {
                    metrics::record_write_failure(channel);
                    tracing::debug!(channel = %channel, error = %e, "Log append failed");
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
