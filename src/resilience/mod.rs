//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (backend resolve, upstream hop):
//!     → timeouts.rs (per-stage deadline)
//!     → on failure: TransportError, surfaced as a generic 500
//! ```

pub mod timeouts;

pub use timeouts::{with_deadline, Stage};
