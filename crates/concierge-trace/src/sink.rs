//! Span sink trait and the two provided implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

/// Outcome of a closed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

impl SpanStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Opaque handle for a span opened on a sink.
///
/// Handles are only meaningful to the sink that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanHandle(u64);

impl SpanHandle {
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// A completed span as retained by [`MemoryTraceSink`].
#[derive(Debug, Clone)]
pub struct SpanRecord {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub status: SpanStatus,
    /// Attributes from open and close, in emission order.
    pub attributes: Vec<(String, String)>,
}

impl SpanRecord {
    /// Look up an attribute value by key (last write wins).
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A numeric score recorded against a turn correlation id.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub correlation_id: String,
    pub name: String,
    pub value: f64,
    pub comment: Option<String>,
}

/// Build a span attribute pair.
pub fn kv(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Destination for spans and scores emitted during a turn.
///
/// Implementations must be shareable across concurrent turns; all methods
/// take `&self`.
pub trait TraceSink: Send + Sync {
    /// Open a span. A `parent` of `None` starts a new trace tree.
    fn open_span(
        &self,
        name: &str,
        parent: Option<SpanHandle>,
        attributes: Vec<(String, String)>,
    ) -> SpanHandle;

    /// Close a previously opened span. Closing an unknown handle is a no-op.
    fn close_span(&self, handle: SpanHandle, status: SpanStatus, attributes: Vec<(String, String)>);

    /// Record a named score against a turn correlation id.
    fn record_score(&self, correlation_id: &str, name: &str, value: f64, comment: Option<&str>);
}

struct OpenSpan {
    name: String,
    parent_id: Option<u64>,
    started_at: DateTime<Utc>,
    started: Instant,
    attributes: Vec<(String, String)>,
}

/// Sink that forwards span lifecycle and scores as `tracing` events.
///
/// Open spans are tracked only to compute close-time durations; nothing is
/// retained after close.
pub struct LogTraceSink {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, OpenSpan>>,
}

impl LogTraceSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for LogTraceSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceSink for LogTraceSink {
    fn open_span(
        &self,
        name: &str,
        parent: Option<SpanHandle>,
        attributes: Vec<(String, String)>,
    ) -> SpanHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            span_id = id,
            parent_id = parent.map(SpanHandle::id),
            span = name,
            "Span opened"
        );
        self.open.lock().expect("trace sink mutex poisoned").insert(
            id,
            OpenSpan {
                name: name.to_string(),
                parent_id: parent.map(SpanHandle::id),
                started_at: Utc::now(),
                started: Instant::now(),
                attributes,
            },
        );
        SpanHandle(id)
    }

    fn close_span(
        &self,
        handle: SpanHandle,
        status: SpanStatus,
        _attributes: Vec<(String, String)>,
    ) {
        let open = self
            .open
            .lock()
            .expect("trace sink mutex poisoned")
            .remove(&handle.id());
        if let Some(span) = open {
            debug!(
                span_id = handle.id(),
                span = span.name.as_str(),
                status = status.as_str(),
                duration_ms = span.started.elapsed().as_millis() as u64,
                "Span closed"
            );
        }
    }

    fn record_score(&self, correlation_id: &str, name: &str, value: f64, comment: Option<&str>) {
        debug!(
            correlation_id = correlation_id,
            score = name,
            value = value,
            comment = comment,
            "Score recorded"
        );
    }
}

#[derive(Default)]
struct MemoryInner {
    next_id: u64,
    open: HashMap<u64, OpenSpan>,
    finished: Vec<SpanRecord>,
    scores: Vec<ScoreRecord>,
}

/// In-memory sink for tests.
///
/// Buffers finished spans and scores in emission order and exposes query
/// helpers for assertions.
#[derive(Default)]
pub struct MemoryTraceSink {
    inner: Mutex<MemoryInner>,
}

impl MemoryTraceSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All closed spans, in close order.
    #[must_use]
    pub fn finished_spans(&self) -> Vec<SpanRecord> {
        self.inner
            .lock()
            .expect("trace sink mutex poisoned")
            .finished
            .clone()
    }

    /// Closed spans with the given name.
    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<SpanRecord> {
        self.finished_spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    /// Number of spans opened but never closed.
    #[must_use]
    pub fn open_span_count(&self) -> usize {
        self.inner
            .lock()
            .expect("trace sink mutex poisoned")
            .open
            .len()
    }

    /// All recorded scores, in emission order.
    #[must_use]
    pub fn scores(&self) -> Vec<ScoreRecord> {
        self.inner
            .lock()
            .expect("trace sink mutex poisoned")
            .scores
            .clone()
    }

    /// The value of the named score for a correlation id, if recorded.
    #[must_use]
    pub fn score_value(&self, correlation_id: &str, name: &str) -> Option<f64> {
        self.scores()
            .into_iter()
            .find(|s| s.correlation_id == correlation_id && s.name == name)
            .map(|s| s.value)
    }
}

impl TraceSink for MemoryTraceSink {
    fn open_span(
        &self,
        name: &str,
        parent: Option<SpanHandle>,
        attributes: Vec<(String, String)>,
    ) -> SpanHandle {
        let mut inner = self.inner.lock().expect("trace sink mutex poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.open.insert(
            id,
            OpenSpan {
                name: name.to_string(),
                parent_id: parent.map(SpanHandle::id),
                started_at: Utc::now(),
                started: Instant::now(),
                attributes,
            },
        );
        SpanHandle(id)
    }

    fn close_span(&self, handle: SpanHandle, status: SpanStatus, attributes: Vec<(String, String)>) {
        let mut inner = self.inner.lock().expect("trace sink mutex poisoned");
        if let Some(open) = inner.open.remove(&handle.id()) {
            let mut merged = open.attributes;
            merged.extend(attributes);
            inner.finished.push(SpanRecord {
                id: handle.id(),
                parent_id: open.parent_id,
                name: open.name,
                started_at: open.started_at,
                duration: open.started.elapsed(),
                status,
                attributes: merged,
            });
        }
    }

    fn record_score(&self, correlation_id: &str, name: &str, value: f64, comment: Option<&str>) {
        self.inner
            .lock()
            .expect("trace sink mutex poisoned")
            .scores
            .push(ScoreRecord {
                correlation_id: correlation_id.to_string(),
                name: name.to_string(),
                value,
                comment: comment.map(str::to_string),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_span_lifecycle() {
        let sink = MemoryTraceSink::new();

        let root = sink.open_span("turn", None, vec![kv("session_id", "s-1")]);
        let child = sink.open_span("router", Some(root), vec![]);
        sink.close_span(child, SpanStatus::Ok, vec![kv("intent", "booking")]);
        sink.close_span(root, SpanStatus::Ok, vec![]);

        let finished = sink.finished_spans();
        assert_eq!(finished.len(), 2);
        assert_eq!(sink.open_span_count(), 0);

        // Child closes first.
        assert_eq!(finished[0].name, "router");
        assert_eq!(finished[0].parent_id, Some(root.id()));
        assert_eq!(finished[0].attribute("intent"), Some("booking"));

        assert_eq!(finished[1].name, "turn");
        assert_eq!(finished[1].parent_id, None);
        assert_eq!(finished[1].attribute("session_id"), Some("s-1"));
    }

    #[test]
    fn close_merges_attributes_with_last_write_winning() {
        let sink = MemoryTraceSink::new();
        let span = sink.open_span("review", None, vec![kv("pass", "1")]);
        sink.close_span(span, SpanStatus::Ok, vec![kv("pass", "2"), kv("score", "8")]);

        let record = &sink.finished_spans()[0];
        assert_eq!(record.attribute("pass"), Some("2"));
        assert_eq!(record.attribute("score"), Some("8"));
    }

    #[test]
    fn closing_unknown_handle_is_ignored() {
        let sink = MemoryTraceSink::new();
        sink.close_span(SpanHandle(99), SpanStatus::Error, vec![]);
        assert!(sink.finished_spans().is_empty());
    }

    #[test]
    fn scores_are_queryable_by_correlation_id() {
        let sink = MemoryTraceSink::new();
        sink.record_score("c-1", "router_confidence", 0.92, None);
        sink.record_score("c-1", "review_score", 0.8, Some("approved"));
        sink.record_score("c-2", "router_confidence", 0.4, None);

        assert_eq!(sink.score_value("c-1", "router_confidence"), Some(0.92));
        assert_eq!(sink.score_value("c-1", "review_score"), Some(0.8));
        assert_eq!(sink.score_value("c-2", "review_score"), None);
        assert_eq!(sink.scores().len(), 3);
    }

    #[test]
    fn log_sink_issues_distinct_handles() {
        let sink = LogTraceSink::new();
        let a = sink.open_span("turn", None, vec![]);
        let b = sink.open_span("router", Some(a), vec![]);
        assert_ne!(a, b);
        sink.close_span(b, SpanStatus::Ok, vec![]);
        sink.close_span(a, SpanStatus::Ok, vec![]);
    }

    #[test]
    fn span_status_strings() {
        assert_eq!(SpanStatus::Ok.as_str(), "ok");
        assert_eq!(SpanStatus::Error.as_str(), "error");
    }
}
