//! Execution tracing for dvagent.
//!
//! Records one [`Trace`] per chat request made of nested spans
//! (AGENT → LLM → TOOL) with timing, status, inputs and outputs. Traces
//! live only in process memory, bounded by [`TraceStore`].

pub mod model;
pub mod store;

pub use model::{RequestMetadata, Span, SpanKind, SpanStatus, Trace, TraceStatus, TraceSummary};
pub use store::{DEFAULT_MAX_TRACES, TraceStore};
