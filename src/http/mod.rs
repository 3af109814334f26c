//! HTTP host and request telemetry.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request id)
//!     → error.rs (error boundary)
//!     → middleware/brief.rs → [route match] → middleware/trace.rs
//!     → handler (snapshot.rs Traced value tap)
//!     → completion.rs (probes fire when the body is dropped)
//! ```

pub mod completion;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod request;
pub mod server;
pub mod snapshot;

pub use error::{AppError, ErrorBody, UnhandledError};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{routes, with_telemetry, HttpServer, Telemetry};
pub use snapshot::Traced;
