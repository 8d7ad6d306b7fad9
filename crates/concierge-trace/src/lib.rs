//! Trace emission and turn metrics.
//!
//! The orchestrator records one span per pipeline stage plus per-tool-call
//! child spans through the [`TraceSink`] trait. Implementations decide where
//! the data goes: [`LogTraceSink`] bridges onto `tracing` events,
//! [`MemoryTraceSink`] buffers records for test assertions. Nothing in this
//! crate is a global; sinks are constructor-injected into the orchestrator.

pub mod metrics;
pub mod sink;

pub use metrics::{MetricsRecorder, MetricsSummary};
pub use sink::{
    kv, LogTraceSink, MemoryTraceSink, ScoreRecord, SpanHandle, SpanRecord, SpanStatus, TraceSink,
};
