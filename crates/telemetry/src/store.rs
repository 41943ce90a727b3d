//! Thread-safe, size-bounded trace store.
//!
//! Every method is infallible: unknown ids yield `None`/`false` and a
//! poisoned lock is recovered rather than propagated.

use crate::model::*;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Default number of traces kept in memory.
pub const DEFAULT_MAX_TRACES: usize = 100;

/// In-memory ledger of execution traces.
///
/// Insertion order defines eviction order (FIFO): once more than
/// `max_traces` traces exist, the oldest inserted are dropped.
pub struct TraceStore {
    max_traces: usize,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Trace ids, oldest first.
    order: VecDeque<String>,
    traces: HashMap<String, Trace>,
}

impl TraceStore {
    /// Create a store bounded to `max_traces` entries (minimum 1).
    pub fn new(max_traces: usize) -> Self {
        Self {
            max_traces: max_traces.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn max_traces(&self) -> usize {
        self.max_traces
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Writes ────────────────────────────────────────────────────────

    /// Open a trace. An empty or absent `request_id` gets a fresh UUID.
    /// Reusing an existing id replaces that trace in its original slot.
    pub fn create_trace(&self, request_id: Option<&str>, user_message: &str) -> String {
        let trace_id = match request_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut inner = self.write();
        let previous = inner
            .traces
            .insert(trace_id.clone(), Trace::new(trace_id.clone(), user_message));
        if previous.is_none() {
            inner.order.push_back(trace_id.clone());
        }

        while inner.order.len() > self.max_traces {
            if let Some(evicted) = inner.order.pop_front() {
                inner.traces.remove(&evicted);
                tracing::debug!(trace_id = %evicted, "Evicted oldest trace");
            }
        }

        trace_id
    }

    /// Append a running span. Unknown trace ⇒ `None`, nothing changes.
    pub fn add_span(
        &self,
        trace_id: &str,
        kind: SpanKind,
        name: &str,
        inputs: Value,
        parent_id: Option<&str>,
    ) -> Option<String> {
        let mut inner = self.write();
        let trace = inner.traces.get_mut(trace_id)?;

        let mut span = Span::new(kind, name, inputs).with_parent(parent_id.map(str::to_string));
        while trace.span(&span.span_id).is_some() {
            span.span_id = short_id();
        }
        let span_id = span.span_id.clone();
        trace.spans.push(span);
        Some(span_id)
    }

    /// Finish a running span. Returns `false` (and changes nothing) when the
    /// trace or span is unknown or the span already finished.
    pub fn complete_span(&self, trace_id: &str, span_id: &str, outputs: Value, status: SpanStatus) -> bool {
        let mut inner = self.write();
        inner
            .traces
            .get_mut(trace_id)
            .and_then(|t| t.span_mut(span_id))
            .is_some_and(|span| span.end(outputs, status))
    }

    /// Set the final status and execution time. Unknown trace ⇒ `false`.
    pub fn complete_trace(&self, trace_id: &str, status: TraceStatus) -> bool {
        let mut inner = self.write();
        match inner.traces.get_mut(trace_id) {
            Some(trace) => {
                trace.end(status);
                true
            }
            None => false,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Snapshot of one trace.
    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        self.read().traces.get(trace_id).cloned()
    }

    /// Most recent first, skipping `offset`.
    pub fn list_traces(&self, limit: usize, offset: usize) -> Vec<Trace> {
        let inner = self.read();
        inner
            .order
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.traces.get(id).cloned())
            .collect()
    }

    /// Like [`list_traces`](Self::list_traces) but without span payloads.
    pub fn list_summaries(&self, limit: usize, offset: usize) -> Vec<TraceSummary> {
        let inner = self.read();
        inner
            .order
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.traces.get(id).map(Trace::summary))
            .collect()
    }

    pub fn get_total_traces(&self) -> usize {
        self.read().traces.len()
    }
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRACES)
    }
}
