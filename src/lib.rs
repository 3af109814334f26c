//! Multi-channel request telemetry for an axum backend.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::{Channel, ChannelRouter, LoggerSettings};
