//! Console gating for framework log output.
//!
//! Channel lines (emitted by the router under a channel target) always reach
//! the console; the router has already checked the channel's console sink.
//! Everything else, from axum, hyper, tower-http or this crate, is printed
//! only when the framework-debug channel is enabled with its console sink.

use tracing::Metadata;
use tracing_subscriber::layer::{Context, Filter};

use crate::observability::settings::{Channel, LoggerSettings, Sink};

#[derive(Debug, Clone, Copy)]
pub struct ConsoleFilter {
    framework_console: bool,
}

impl ConsoleFilter {
    pub fn new(settings: &LoggerSettings) -> Self {
        Self {
            framework_console: settings.channel(Channel::FrameworkDebug).fires(Sink::Console),
        }
    }

    pub fn allows(&self, target: &str) -> bool {
        if Channel::ALL.iter().any(|c| c.target() == target) {
            return true;
        }
        self.framework_console
    }
}

impl<S> Filter<S> for ConsoleFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        self.allows(meta.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_always_passes() {
        let quiet = ConsoleFilter::new(&LoggerSettings::parse("BC", false).unwrap());
        assert!(quiet.allows("brief"));
        assert!(quiet.allows("errors"));
        assert!(!quiet.allows("tower_http::trace::on_response"));
        assert!(!quiet.allows("api_telemetry::http::server"));
    }

    #[test]
    fn test_framework_needs_enabled_console() {
        let verbose = ConsoleFilter::new(&LoggerSettings::parse("BC.NC", false).unwrap());
        assert!(verbose.allows("hyper::proto"));

        let gated_off = ConsoleFilter::new(&LoggerSettings::parse("BC.NCD", false).unwrap());
        assert!(!gated_off.allows("hyper::proto"));

        let gated_on = ConsoleFilter::new(&LoggerSettings::parse("BC.NCD", true).unwrap());
        assert!(gated_on.allows("hyper::proto"));

        let no_console = ConsoleFilter::new(&LoggerSettings::parse("BC.NF", false).unwrap());
        assert!(!no_console.allows("hyper::proto"));
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let filter = ConsoleFilter::new(&LoggerSettings::disabled());
        assert!(!filter.allows("axum::serve"));
    }
}
