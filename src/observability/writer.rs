//! Dated log files and day rollover.
//!
//! # Responsibilities
//! - Resolve `{log_dir}/{channel}/{YYYY-MM-DD}{ext}` for the entry's day
//! - Create the day's file with a header line on its first write
//! - Detect a day change and archive the channel before the new file appears
//!
//! # Design Decisions
//! - Files are opened in append mode per write and never held open
//! - The header is written with `create_new`, so it lands exactly once
//! - The file date comes from the entry's timestamp, the same instant its
//!   delimiter line shows
//! - Each channel tracks its own "last seen day" and archives only its own
//!   directory, from its own writer task, so an archive never races an append
//! - An entry older than the channel's last seen day goes to the current file;
//!   an archived day is never reopened

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::observability::archive::Archiver;
use crate::observability::clock::{date_stamp, time_stamp, Clock};
use crate::observability::router::LogEntry;
use crate::observability::settings::Channel;

/// A channel's file for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub channel: Channel,
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl LogFile {
    pub fn resolve(log_dir: &Path, channel: Channel, date: NaiveDate) -> Self {
        let name = format!("{}{}", date_stamp(date), channel.extension());
        Self {
            channel,
            date,
            path: log_dir.join(channel.dir_name()).join(name),
        }
    }

    /// First line of a fresh file.
    pub fn header(&self) -> String {
        format!("#===# {} #===#\n", date_stamp(self.date))
    }
}

/// Remembers the last day a file was created on.
#[derive(Debug)]
pub struct DayTracker {
    last_seen: Mutex<NaiveDate>,
}

impl DayTracker {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_seen: Mutex::new(today),
        }
    }

    /// Record `today`; true if it differs from the previously seen day.
    pub fn roll(&self, today: NaiveDate) -> bool {
        let mut last = self.last_seen.lock().unwrap_or_else(|p| p.into_inner());
        if *last == today {
            return false;
        }
        *last = today;
        true
    }

    pub fn last_seen(&self) -> NaiveDate {
        *self.last_seen.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Format an entry the way it is appended to its file.
pub fn format_entry(entry: &LogEntry) -> String {
    let time = time_stamp(&entry.timestamp);
    if entry.channel.is_multiline() {
        format!("\n#--# {} #--#\n{}\n", time, entry.body)
    } else {
        format!("{}  {}\n", time, entry.body)
    }
}

/// Appends entries to the dated file of their channel.
#[derive(Debug)]
pub struct FileWriter {
    log_dir: PathBuf,
    clock: Arc<dyn Clock>,
    trackers: [DayTracker; 4],
    archiver: Archiver,
}

impl FileWriter {
    pub fn new(log_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>, archiver: Archiver) -> Self {
        let today = clock.today();
        Self {
            log_dir: log_dir.into(),
            clock,
            trackers: Channel::ALL.map(|_| DayTracker::new(today)),
            archiver,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn resolve(&self, channel: Channel) -> LogFile {
        LogFile::resolve(&self.log_dir, channel, self.clock.today())
    }

    pub fn resolve_path(&self, channel: Channel) -> PathBuf {
        self.resolve(channel).path
    }

    /// The file `entry` belongs to.
    pub fn resolve_entry(&self, entry: &LogEntry) -> LogFile {
        let tracker = &self.trackers[entry.channel.index()];
        let date = entry.timestamp.date_naive().max(tracker.last_seen());
        LogFile::resolve(&self.log_dir, entry.channel, date)
    }

    /// Append `entry` to the file of its channel and day.
    pub async fn write(&self, entry: &LogEntry) -> io::Result<()> {
        let file = self.resolve_entry(entry);

        if !fs::try_exists(&file.path).await? {
            let tracker = &self.trackers[entry.channel.index()];
            if tracker.roll(file.date) && self.archiver.archives(entry.channel) {
                match self.archiver.archive(entry.channel).await {
                    Ok(report) => tracing::debug!(
                        channel = %entry.channel,
                        day = %file.date,
                        archived = report.done(),
                        failed = report.failed(),
                        "Day rollover"
                    ),
                    Err(e) => {
                        tracing::warn!(channel = %entry.channel, error = %e, "Archive scan failed")
                    }
                }
            }
            self.create(&file).await?;
        }

        let mut handle = OpenOptions::new().append(true).open(&file.path).await?;
        handle.write_all(format_entry(entry).as_bytes()).await?;
        handle.flush().await
    }

    async fn create(&self, file: &LogFile) -> io::Result<()> {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file.path)
            .await
        {
            Ok(mut handle) => {
                handle.write_all(file.header().as_bytes()).await?;
                handle.flush().await
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }
}
