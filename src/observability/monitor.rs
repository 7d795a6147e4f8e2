//! In-memory performance monitor.
//!
//! Tracks in-flight requests and aggregate counters for the `/_/health` and
//! `/_/metrics` endpoints. Owned by the server and shared by `Arc`; nothing
//! here is global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::lifecycle::Purgeable;

#[derive(Debug, Clone)]
pub struct RequestTrace {
    pub method: Method,
    pub path: String,
    pub started_at: Instant,
}

/// Handle returned by [`PerformanceMonitor::start_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Degraded,
    Poor,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub score: u32,
    pub recommendations: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub uptime: String,
    pub total_requests: u64,
    pub error_rate: String,
    pub average_response_time: String,
    pub requests_per_minute: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub summary: Summary,
    pub health: HealthReport,
    pub in_flight: usize,
}

pub struct PerformanceMonitor {
    started_at: Instant,
    traces: DashMap<TraceId, RequestTrace>,
    requests: AtomicU64,
    errors: AtomicU64,
    total_response_ms: AtomicU64,
    trace_max_age: Duration,
}

impl PerformanceMonitor {
    pub fn new(trace_max_age: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            traces: DashMap::new(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_response_ms: AtomicU64::new(0),
            trace_max_age,
        }
    }

    pub fn start_request(&self, method: &Method, path: &str) -> TraceId {
        let id = TraceId(Uuid::new_v4());
        self.traces.insert(
            id,
            RequestTrace {
                method: method.clone(),
                path: path.to_string(),
                started_at: Instant::now(),
            },
        );
        id
    }

    /// Close a trace. A trace already dropped by maintenance still counts,
    /// with unknown (zero) latency.
    pub fn end_request(&self, id: TraceId, status: StatusCode) {
        let elapsed = self
            .traces
            .remove(&id)
            .map(|(_, trace)| trace.started_at.elapsed())
            .unwrap_or_default();
        self.record(elapsed, status);
    }

    pub(crate) fn record(&self, elapsed: Duration, status: StatusCode) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
        if status.as_u16() >= 400 {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.traces.len()
    }

    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Error rate in percent.
    pub fn error_rate(&self) -> f64 {
        let requests = self.total_requests();
        if requests == 0 {
            return 0.0;
        }
        self.errors.load(Ordering::Relaxed) as f64 / requests as f64 * 100.0
    }

    /// Mean latency in milliseconds.
    pub fn average_response_ms(&self) -> f64 {
        let requests = self.total_requests();
        if requests == 0 {
            return 0.0;
        }
        self.total_response_ms.load(Ordering::Relaxed) as f64 / requests as f64
    }

    pub fn health(&self) -> HealthReport {
        let error_rate = self.error_rate();
        let average_ms = self.average_response_ms();
        HealthReport {
            status: health_status(error_rate, average_ms),
            score: health_score(error_rate, average_ms),
            recommendations: recommendations(error_rate, average_ms),
        }
    }

    pub fn report(&self) -> PerformanceReport {
        let uptime = self.started_at.elapsed();
        let minutes = uptime.as_secs_f64() / 60.0;
        let per_minute = if minutes > 0.0 {
            self.total_requests() as f64 / minutes
        } else {
            0.0
        };

        PerformanceReport {
            summary: Summary {
                uptime: format_uptime(uptime),
                total_requests: self.total_requests(),
                error_rate: format!("{:.2}%", self.error_rate()),
                average_response_time: format!("{:.2}ms", self.average_response_ms()),
                requests_per_minute: format!("{per_minute:.2}"),
            },
            health: self.health(),
            in_flight: self.in_flight(),
        }
    }
}

impl Purgeable for PerformanceMonitor {
    fn name(&self) -> &'static str {
        "request_traces"
    }

    /// Drop traces of requests that never completed (client went away
    /// mid-stream, task cancelled).
    fn purge(&self) -> usize {
        let before = self.traces.len();
        let max_age = self.trace_max_age;
        self.traces
            .retain(|_, trace| trace.started_at.elapsed() <= max_age);
        before.saturating_sub(self.traces.len())
    }
}

pub fn health_status(error_rate: f64, average_ms: f64) -> HealthStatus {
    if error_rate > 10.0 || average_ms > 3000.0 {
        HealthStatus::Poor
    } else if error_rate > 5.0 || average_ms > 1000.0 {
        HealthStatus::Degraded
    } else if error_rate > 1.0 || average_ms > 500.0 {
        HealthStatus::Good
    } else {
        HealthStatus::Excellent
    }
}

pub fn health_score(error_rate: f64, average_ms: f64) -> u32 {
    let mut score = 100.0 - (error_rate * 2.0).min(40.0);
    if average_ms > 100.0 {
        score -= ((average_ms - 100.0) / 10.0).min(30.0);
    }
    score.max(0.0).round() as u32
}

pub fn recommendations(error_rate: f64, average_ms: f64) -> Vec<&'static str> {
    let mut out = Vec::new();
    if error_rate > 5.0 {
        out.push("High error rate: check backend availability and signature configuration");
    }
    if average_ms > 1000.0 {
        out.push("Slow responses: check backend and upstream latency");
    }
    if out.is_empty() {
        out.push("System is performing well");
    }
    out
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
