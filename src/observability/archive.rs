//! Gzip archival of past days' log files.
//!
//! # Responsibilities
//! - Scan a channel directory for files from previous days
//! - Compress each one next to the original as `<name>.gz`
//! - Delete the original only once the compressed copy is synced and closed
//!
//! # Design Decisions
//! - Today's file is never touched; it is the only file writers append to
//! - A failing unit is abandoned with its source intact; the scan goes on
//! - Fixed compression level (5 by default) rather than maximum
//! - Runs on the blocking pool; flate2 is synchronous

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::observability::clock::{date_stamp, Clock};
use crate::observability::metrics;
use crate::observability::settings::{Channel, LoggerSettings};

/// Extension appended to archived files.
pub const COMPRESSED_EXTENSION: &str = ".gz";

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 5;

/// Why a directory entry was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Name carries today's date.
    Today,
    AlreadyCompressed,
    /// Not a file of this channel.
    ForeignExtension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Pending,
    Compressing,
    Done,
    Skipped(SkipReason),
    Failed,
}

/// One file considered during a scan.
#[derive(Debug, Clone)]
pub struct ArchiveUnit {
    pub source: PathBuf,
    pub compressed: PathBuf,
    pub state: ArchiveState,
}

impl ArchiveUnit {
    pub fn new(source: PathBuf) -> Self {
        let mut compressed = source.clone().into_os_string();
        compressed.push(COMPRESSED_EXTENSION);
        Self {
            source,
            compressed: PathBuf::from(compressed),
            state: ArchiveState::Pending,
        }
    }

    /// Compress the source and remove it. On error the source is kept.
    fn run(&mut self, level: Compression) -> io::Result<()> {
        self.state = ArchiveState::Compressing;
        match compress(&self.source, &self.compressed, level) {
            Ok(()) => {}
            Err(e) => {
                let _ = fs::remove_file(&self.compressed);
                self.state = ArchiveState::Failed;
                return Err(e);
            }
        }
        if let Err(e) = fs::remove_file(&self.source) {
            self.state = ArchiveState::Failed;
            return Err(e);
        }
        self.state = ArchiveState::Done;
        Ok(())
    }
}

fn compress(source: &Path, target: &Path, level: Compression) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    let output = File::create(target)?;
    let mut encoder = GzEncoder::new(output, level);
    io::copy(&mut input, &mut encoder)?;
    let output = encoder.finish()?;
    output.sync_all()
}

/// Outcome of one or more scans.
#[derive(Debug, Default, Clone)]
pub struct ArchiveReport {
    pub units: Vec<ArchiveUnit>,
}

impl ArchiveReport {
    fn count(&self, f: impl Fn(&ArchiveState) -> bool) -> usize {
        self.units.iter().filter(|u| f(&u.state)).count()
    }

    pub fn done(&self) -> usize {
        self.count(|s| *s == ArchiveState::Done)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| *s == ArchiveState::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ArchiveState::Skipped(_)))
    }

    pub fn merge(&mut self, other: ArchiveReport) {
        self.units.extend(other.units);
    }
}

/// Decide whether `file_name` in `channel`'s directory is left alone.
pub fn classify(file_name: &str, channel: Channel, today: &str) -> Option<SkipReason> {
    if file_name.contains(today) {
        Some(SkipReason::Today)
    } else if file_name.ends_with(COMPRESSED_EXTENSION) {
        Some(SkipReason::AlreadyCompressed)
    } else if !file_name.ends_with(channel.extension()) {
        Some(SkipReason::ForeignExtension)
    } else {
        None
    }
}

/// Compresses stale files of archive-enabled channels.
#[derive(Debug, Clone)]
pub struct Archiver {
    log_dir: PathBuf,
    settings: Arc<LoggerSettings>,
    clock: Arc<dyn Clock>,
    level: Compression,
}

impl Archiver {
    pub fn new(
        log_dir: impl Into<PathBuf>,
        settings: Arc<LoggerSettings>,
        clock: Arc<dyn Clock>,
        level: u32,
    ) -> Self {
        Self {
            log_dir: log_dir.into(),
            settings,
            clock,
            level: Compression::new(level.min(9)),
        }
    }

    pub fn channel_dir(&self, channel: Channel) -> PathBuf {
        self.log_dir.join(channel.dir_name())
    }

    /// Archive one channel's directory regardless of its archive flag.
    pub async fn archive(&self, channel: Channel) -> io::Result<ArchiveReport> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.archive_blocking(channel))
            .await
            .map_err(io::Error::other)?
    }

    /// Archive every channel configured with the archive sink.
    pub async fn archive_all(&self) -> ArchiveReport {
        let mut report = ArchiveReport::default();
        for channel in self.archive_channels() {
            match self.archive(channel).await {
                Ok(r) => report.merge(r),
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "Archive scan failed")
                }
            }
        }
        report
    }

    /// True when `channel` is configured with the archive sink.
    pub fn archives(&self, channel: Channel) -> bool {
        self.settings.channel(channel).sinks.archive
    }

    fn archive_channels(&self) -> Vec<Channel> {
        self.settings
            .channels()
            .filter(|c| c.sinks.archive)
            .map(|c| c.channel)
            .collect()
    }

    /// Synchronous scan of one channel directory.
    pub fn archive_blocking(&self, channel: Channel) -> io::Result<ArchiveReport> {
        let dir = self.channel_dir(channel);
        let today = date_stamp(self.clock.today());

        let mut names: Vec<String> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ArchiveReport::default()),
            Err(e) => return Err(e),
        };
        names.sort();

        let mut report = ArchiveReport::default();
        for name in names {
            let mut unit = ArchiveUnit::new(dir.join(&name));
            match classify(&name, channel, &today) {
                Some(reason) => unit.state = ArchiveState::Skipped(reason),
                None => match unit.run(self.level) {
                    Ok(()) => tracing::debug!(file = %name, "Archived"),
                    Err(e) => tracing::warn!(file = %name, error = %e, "Archiving failed; source kept"),
                },
            }
            metrics::record_archive(unit.state);
            report.units.push(unit);
        }
        Ok(report)
    }
}
