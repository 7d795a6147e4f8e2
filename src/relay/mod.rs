//! Download relay subsystem.
//!
//! # Data Flow
//! ```text
//! client request
//!     → dispatcher.rs (OPTIONS locally; config snapshot; monitor + metrics)
//!     → download.rs (path → signature → resolve → upstream fetch)
//!     → redirect.rs (manual 3xx handling, self-loop re-entry, 5-hop budget)
//!     → dispatcher.rs (response allow-list, CORS, media cache) → client
//!
//! Failures anywhere become error.rs ProxyError → JSON {code, message}.
//! ```

pub mod dispatcher;
pub mod download;
pub mod error;
pub mod redirect;

pub use dispatcher::Dispatcher;
pub use download::{DownloadPipeline, DownloadRequest};
pub use error::ProxyError;
pub use redirect::MAX_REDIRECT_HOPS;
