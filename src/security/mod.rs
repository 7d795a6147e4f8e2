//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → path.rs (percent-decode, reject traversal / relative paths)
//!     → [signature verification]
//!     → headers.rs (strip identity + hop-by-hop headers)
//!     → forwarded upstream
//!
//! Upstream response:
//!     → headers.rs (allow-list, CORS echo, media cache policy)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Allow-list on the way out, deny-list on the way in
//! - Fail closed: reject on any path check failure

pub mod headers;
pub mod path;

pub use headers::{
    apply_cors, cors_origin, filter_response_headers, finalize_response, strip_request_headers,
};
pub use path::{decode_path, is_valid_path};
