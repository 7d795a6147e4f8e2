//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and pipeline stages produce:
//!     → logging.rs (structured tracing events, request_id span field)
//!     → metrics.rs (Prometheus counters and histograms)
//!     → monitor.rs (in-flight traces, error rate, latency → health score)
//!
//! Consumers:
//!     → stdout log
//!     → Prometheus scrape on observability.metrics_address
//!     → /_/health and /_/metrics service endpoints
//! ```

pub mod logging;
pub mod metrics;
pub mod monitor;

pub use logging::init_logging;
pub use monitor::{HealthStatus, PerformanceMonitor, PerformanceReport};
