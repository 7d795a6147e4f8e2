//! Backend resolver.
//!
//! # Data Flow
//! ```text
//! decoded path
//!     → client.rs (POST {ADDRESS}/api/fs/link, Authorization: TOKEN)
//!     → types.rs (BackendLinkResult)
//!     → Resolution::Link (upstream URL + header overrides)
//!       or Resolution::PassThrough (backend error body, forwarded as-is)
//! ```

pub mod client;
pub mod types;

pub use client::{BackendClient, Resolution};
pub use types::{BackendLinkResult, HeaderValues, LinkData};
