//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build server → Spawn maintenance → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → server drains, maintenance loop exits
//!
//! Maintenance (maintenance.rs):
//!     every interval → purge each registered cache handle
//! ```

pub mod maintenance;
pub mod shutdown;

pub use maintenance::{CacheRegistry, Purgeable};
pub use shutdown::Shutdown;
