//! Logger settings parsed from the compact `LOGGER` code.
//!
//! # Format
//! ```text
//! "BCA.ED.RFA"
//!  │││ ││ │││
//!  │││ ││ ││└─ A: archive past files
//!  │││ ││ │└── F: write dated files
//!  │││ ││ └─── R: request channel
//!  │││ │└───── D: only when the debug flag is set
//!  │││ └────── E: error channel
//!  ││└──────── A: archive
//!  │└───────── C: console
//!  └────────── B: brief channel
//! ```
//!
//! # Design Decisions
//! - Parsed once at startup into an immutable value shared via `Arc`
//! - Any malformed code is fatal; there is no partially configured logger
//! - Each channel is configured by the first segment holding its selector

use serde::Serialize;
use thiserror::Error;

/// One independently configured category of log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// One-line request summaries.
    Brief,
    /// Unhandled errors from the HTTP boundary.
    Error,
    /// Full request/response trace documents.
    Request,
    /// The framework's own log output.
    FrameworkDebug,
}

/// `tracing` target used for brief channel console lines.
pub const BRIEF_TARGET: &str = "brief";
/// `tracing` target used for error channel console lines.
pub const ERROR_TARGET: &str = "errors";
/// `tracing` target used for request channel console lines.
pub const REQUEST_TARGET: &str = "requests";
/// `tracing` target used for framework channel console lines.
pub const FRAMEWORK_TARGET: &str = "framework";

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Brief,
        Channel::Error,
        Channel::Request,
        Channel::FrameworkDebug,
    ];

    /// Letter selecting this channel in the settings code.
    pub fn selector(self) -> char {
        match self {
            Channel::Brief => 'B',
            Channel::Error => 'E',
            Channel::Request => 'R',
            Channel::FrameworkDebug => 'N',
        }
    }

    /// Directory under the log root holding this channel's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            Channel::Brief => "brief",
            Channel::Error => "errors",
            Channel::Request => "requests",
            Channel::FrameworkDebug => "framework",
        }
    }

    /// File extension of this channel's daily files, dot included.
    pub fn extension(self) -> &'static str {
        match self {
            Channel::Request => ".yaml",
            _ => ".log",
        }
    }

    /// `tracing` target the console sink emits under.
    pub fn target(self) -> &'static str {
        match self {
            Channel::Brief => BRIEF_TARGET,
            Channel::Error => ERROR_TARGET,
            Channel::Request => REQUEST_TARGET,
            Channel::FrameworkDebug => FRAMEWORK_TARGET,
        }
    }

    /// Brief lines are written inline; every other channel gets a delimiter line.
    pub fn is_multiline(self) -> bool {
        !matches!(self, Channel::Brief)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Brief => 0,
            Channel::Error => 1,
            Channel::Request => 2,
            Channel::FrameworkDebug => 3,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A destination for entries of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sink {
    Console,
    File,
    Archive,
}

impl Sink {
    pub const ALL: [Sink; 3] = [Sink::Console, Sink::File, Sink::Archive];

    /// Flag letter of this sink in the settings code.
    pub fn flag(self) -> char {
        match self {
            Sink::Console => 'C',
            Sink::File => 'F',
            Sink::Archive => 'A',
        }
    }
}

/// Flag letter marking a channel as debug-gated.
const DEBUG_FLAG: char = 'D';

/// The set of sinks configured on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SinkSet {
    pub console: bool,
    pub file: bool,
    pub archive: bool,
}

impl SinkSet {
    fn from_segment(segment: &str) -> Self {
        Self {
            console: segment.contains(Sink::Console.flag()),
            file: segment.contains(Sink::File.flag()),
            archive: segment.contains(Sink::Archive.flag()),
        }
    }

    pub fn contains(&self, sink: Sink) -> bool {
        match sink {
            Sink::Console => self.console,
            Sink::File => self.file,
            Sink::Archive => self.archive,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Sink> + '_ {
        Sink::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

/// Resolved configuration of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSettings {
    pub channel: Channel,
    /// Selector present, and the debug flag set if the segment asked for it.
    pub enabled: bool,
    /// The configuring segment carried `D`.
    pub debug_gated: bool,
    pub sinks: SinkSet,
}

impl ChannelSettings {
    fn disabled(channel: Channel) -> Self {
        Self {
            channel,
            enabled: false,
            debug_gated: false,
            sinks: SinkSet::default(),
        }
    }

    /// True when the channel is enabled and `sink` is configured on it.
    pub fn fires(&self, sink: Sink) -> bool {
        self.enabled && self.sinks.contains(sink)
    }

    /// True when an entry routed here would be printed or written somewhere.
    pub fn is_active(&self) -> bool {
        self.fires(Sink::Console) || self.fires(Sink::File)
    }
}

/// Rejected settings code. Each variant has a stable class code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("logger settings error 0: input `{input}` does not select any channel")]
    EnabledMismatch { input: String },

    #[error("logger settings error 1: {count} segments given, at most 4 allowed")]
    TooManySegments { count: usize },

    #[error("logger settings error 2: segment `{segment}` is longer than 5 characters")]
    SegmentTooLong { segment: String },

    #[error("logger settings error 3: segment `{segment}` has no sink flags")]
    BareSegment { segment: String },
}

impl SettingsError {
    /// Class code of the violation (0..=3).
    pub fn code(&self) -> u8 {
        match self {
            SettingsError::EnabledMismatch { .. } => 0,
            SettingsError::TooManySegments { .. } => 1,
            SettingsError::SegmentTooLong { .. } => 2,
            SettingsError::BareSegment { .. } => 3,
        }
    }

    /// Process exit status for this violation. Offset so that class 0 is not success.
    pub fn exit_code(&self) -> i32 {
        10 + i32::from(self.code())
    }
}

/// Immutable logger settings for all four channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggerSettings {
    raw: String,
    debug: bool,
    channels: [ChannelSettings; 4],
}

impl LoggerSettings {
    pub const MAX_SEGMENTS: usize = 4;
    pub const MAX_SEGMENT_LEN: usize = 5;

    /// Parse a settings code. `debug` is the global debug flag.
    pub fn parse(input: &str, debug: bool) -> Result<Self, SettingsError> {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let segments: Vec<&str> = normalized.split('.').collect();

        let select = |channel: Channel| {
            segments
                .iter()
                .copied()
                .find(|s| s.contains(channel.selector()))
        };

        let any_selected = Channel::ALL.iter().any(|c| select(*c).is_some());
        let input_empty = normalized.is_empty();
        if any_selected == input_empty {
            return Err(SettingsError::EnabledMismatch {
                input: input.to_string(),
            });
        }

        if segments.len() > Self::MAX_SEGMENTS {
            return Err(SettingsError::TooManySegments {
                count: segments.len(),
            });
        }

        if let Some(segment) = segments
            .iter()
            .find(|s| s.chars().count() > Self::MAX_SEGMENT_LEN)
        {
            return Err(SettingsError::SegmentTooLong {
                segment: segment.to_string(),
            });
        }

        if let Some(segment) = segments.iter().find(|s| s.chars().count() == 1) {
            return Err(SettingsError::BareSegment {
                segment: segment.to_string(),
            });
        }

        let channels = Channel::ALL.map(|channel| match select(channel) {
            None => ChannelSettings::disabled(channel),
            Some(segment) => {
                let debug_gated = segment.contains(DEBUG_FLAG);
                ChannelSettings {
                    channel,
                    enabled: !debug_gated || debug,
                    debug_gated,
                    sinks: SinkSet::from_segment(segment),
                }
            }
        });

        Ok(Self {
            raw: normalized,
            debug,
            channels,
        })
    }

    /// Settings with every channel disabled.
    pub fn disabled() -> Self {
        Self {
            raw: String::new(),
            debug: false,
            channels: Channel::ALL.map(ChannelSettings::disabled),
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelSettings {
        &self.channels[channel.index()]
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelSettings> {
        self.channels.iter()
    }

    /// False when the settings code was empty.
    pub fn is_enabled(&self) -> bool {
        !self.raw.is_empty()
    }

    /// Normalized settings code.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self::disabled()
    }
}
