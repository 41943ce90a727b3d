//! Ring buffer of recent HTTP requests, exposed at `/api/debug/requests`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Default number of requests remembered.
pub const DEFAULT_CAPACITY: usize = 50;

/// One finished request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    /// RFC 3339, UTC
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: u64,
}

/// Bounded, thread-safe request history. Oldest entries fall off first.
pub struct RequestLog {
    capacity: usize,
    entries: Mutex<VecDeque<RequestLogEntry>>,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: RequestLogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The `limit` most recent entries, most recent last. A `limit` of 0
    /// returns every entry.
    pub fn recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = match limit {
            0 => 0,
            limit => entries.len().saturating_sub(limit),
        };
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Middleware recording every request that passes through the router.
pub async fn record_requests(State(log): State<Arc<RequestLog>>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    log.record(RequestLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        method,
        path,
        status_code: response.status().as_u16(),
        duration_ms: start.elapsed().as_millis() as u64,
    });
    response
}
