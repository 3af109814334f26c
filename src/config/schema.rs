//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::middleware::DEFAULT_MAX_BODY_BYTES;
use crate::observability::archive::DEFAULT_COMPRESSION_LEVEL;
use crate::observability::router::DEFAULT_QUEUE_CAPACITY;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Multi-channel logger settings.
    pub logging: LoggingConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,

    /// Signed cookie verification.
    pub cookies: CookieConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Compact channel code, e.g. "BCA.ED.RFA". Empty disables logging.
    pub settings: String,

    /// Global debug flag; enables `D`-gated channels.
    pub debug: bool,

    /// Root of the per-channel log directories.
    pub log_dir: String,

    /// Pending entries per file channel before new ones are dropped.
    pub queue_capacity: usize,

    /// gzip level for archived files (0-9).
    pub compression_level: u32,

    /// Paths excluded from the brief channel (exact match).
    pub excluded_paths: Vec<String>,

    /// Path prefixes excluded from the brief channel.
    pub excluded_prefixes: Vec<String>,

    /// Largest request body buffered for request traces.
    pub max_body_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            settings: String::new(),
            debug: false,
            log_dir: "logs".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            excluded_paths: vec!["/ping".to_string(), "/assets".to_string()],
            excluded_prefixes: vec!["/assets/".to_string()],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Cookie configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CookieConfig {
    /// Secret used to verify signed cookies.
    pub secret: Option<String>,
}

impl std::fmt::Debug for CookieConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.logging.log_dir, "logs");
        assert_eq!(config.logging.compression_level, 5);
        assert!(config.cookies.secret.is_none());
    }

    #[test]
    fn test_partial_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [logging]
            settings = "BC.EF"
            excluded_prefixes = ["/static/"]
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.settings, "BC.EF");
        assert_eq!(config.logging.excluded_prefixes, vec!["/static/".to_string()]);
        assert_eq!(config.logging.queue_capacity, 1024);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = CookieConfig {
            secret: Some("hunter2".into()),
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
