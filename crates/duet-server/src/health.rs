//! Health check payload.

use std::time::Instant;

use serde::Serialize;

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
    /// Seconds since server start.
    pub uptime_secs: u64,
    /// Number of registered conversation sessions.
    pub active_sessions: usize,
}

/// Build a health snapshot.
#[must_use]
pub fn health_check(start_time: Instant, active_sessions: usize) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions,
    }
}
