//! Observability subsystem: the multi-channel logger.
//!
//! # Data Flow
//! ```text
//! LOGGER code ──▶ settings.rs (LoggerSettings, parsed once)
//!                      │
//! probes / error boundary
//!     → router.rs (route(channel, body))
//!         → console: tracing event ──▶ console.rs filter ──▶ stdout
//!         → file: per-channel queue ──▶ writer.rs (dated file)
//!                                         └─ day rollover ──▶ archive.rs (gzip)
//! ```
//!
//! # Design Decisions
//! - Settings are immutable and passed by `Arc`, never global
//! - Logging never fails or delays a request
//! - Today's file is owned by the writer; archival only touches older files

pub mod archive;
pub mod clock;
pub mod console;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod settings;
pub mod writer;

pub use archive::{ArchiveReport, Archiver};
pub use clock::{Clock, ManualClock, SystemClock};
pub use console::ConsoleFilter;
pub use router::{ChannelRouter, LogEntry};
pub use settings::{Channel, ChannelSettings, LoggerSettings, SettingsError, Sink};
pub use writer::{FileWriter, LogFile};
