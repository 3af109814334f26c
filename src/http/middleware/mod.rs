//! Request telemetry probes.
//!
//! # Data Flow
//! ```text
//! request
//!     → trace.rs trace_probe (outer, buffers body, snapshots request)
//!         → brief.rs (every request)
//!             → panic catcher, timeout
//!                 → router matches
//!                     → trace.rs record_route_params (route layer)
//!                         → handler
//! response body dropped → close callbacks → ChannelRouter
//! ```

pub mod brief;
pub mod trace;

pub use brief::{brief_line, brief_probe, BriefProbe, ExclusionList};
pub use trace::{record_route_params, trace_probe, TraceProbe, DEFAULT_MAX_BODY_BYTES};
