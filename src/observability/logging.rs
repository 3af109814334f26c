//! Process-wide `tracing` subscriber.
//!
//! # Responsibilities
//! - Install the console fmt layer behind the [`ConsoleFilter`]
//! - Honour `RUST_LOG` when set, otherwise derive the level from the settings
//!
//! # Design Decisions
//! - Installed once from the binary; library code only emits events
//! - `debug` level only when the framework-debug console is on
//! - Channel targets are always enabled in the env filter; `RUST_LOG` tunes
//!   framework output, the settings decide which channel lines print

use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter, Layer,
};

use crate::observability::console::ConsoleFilter;
use crate::observability::settings::{Channel, LoggerSettings, Sink};

/// Default `EnvFilter` directive for the given settings.
pub fn default_directive(settings: &LoggerSettings) -> &'static str {
    if settings.channel(Channel::FrameworkDebug).fires(Sink::Console) {
        "debug"
    } else {
        "info"
    }
}

/// `base` (or the settings default) with every channel target enabled.
pub fn env_filter(base: Option<EnvFilter>, settings: &LoggerSettings) -> EnvFilter {
    let mut filter = base.unwrap_or_else(|| EnvFilter::new(default_directive(settings)));
    for channel in Channel::ALL {
        if let Ok(directive) = format!("{}=trace", channel.target()).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initialize the global subscriber.
pub fn init_logging(settings: &LoggerSettings) -> Result<(), TryInitError> {
    let env_filter = env_filter(EnvFilter::try_from_default_env().ok(), settings);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(ConsoleFilter::new(settings)),
        )
        .try_init()
}
