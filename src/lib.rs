//! concierge - guest-message orchestration with review gating and traced
//! escalation
//!
//! Each guest message is classified by a router, handled by an intent-matched
//! specialist agent running a bounded tool loop, gated through a quality
//! review pass, and closed out by a lifecycle assessment whose escalation
//! decision is deterministic policy, never model output.
//!
//! concierge can be used in two ways:
//! - **CLI**: the `concierge` binary processes single messages or a stdin
//!   loop and prints turn reports as JSON
//! - **Library**: construct an [`Orchestrator`] with injected collaborators
//!   and call [`Orchestrator::process_turn`] per message
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Offline demo turn, no API key required
//! concierge chat --demo --message "What time does the spa open?"
//!
//! # Against a configured OpenAI-compatible gateway
//! concierge chat --message "Do you have a deluxe room for March 10-12?"
//!
//! # Wiring snapshot
//! concierge health
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use concierge::{
//!     Config, FrontDesk, KnowledgeStore, LogTraceSink, MemoryKnowledgeStore,
//!     MetricsRecorder, Orchestrator, ScriptedBackend, ToolRegistry, TraceSink,
//! };
//!
//! # async fn demo() -> Result<(), concierge::ConciergeError> {
//! let backend = Arc::new(ScriptedBackend::new());
//! let knowledge = Arc::new(MemoryKnowledgeStore::seeded());
//! let registry = Arc::new(ToolRegistry::builtin(
//!     Arc::new(FrontDesk::seeded()),
//!     Arc::clone(&knowledge) as Arc<dyn KnowledgeStore>,
//!     3,
//! ));
//! let orchestrator = Orchestrator::new(
//!     backend,
//!     registry,
//!     knowledge,
//!     Arc::new(LogTraceSink::new()) as Arc<dyn TraceSink>,
//!     Arc::new(MetricsRecorder::new()),
//!     Config::default(),
//! );
//! let report = orchestrator.process_turn("session-1", "Pool hours?", &[]).await?;
//! println!("{}", report.final_response);
//! # Ok(())
//! # }
//! ```
//!
//! # Degradation, not failure
//!
//! Policy-bounded conditions (tool-loop cap, exhausted review budget) do not
//! fail a turn; they surface as [`Degradation`] flags on the report while
//! the best available response still goes out. Only router, specialist, and
//! review gateway failures are fatal; lifecycle assessment always degrades
//! gracefully.

// Core pipeline surface
pub use concierge_engine::{HealthSnapshot, Orchestrator, MAX_MESSAGE_CHARS};

/// Resolved runtime configuration: policy caps, gateway settings, tool
/// timeouts. Load from `concierge.toml` via [`Config::discover`] or build
/// programmatically via [`Config::builder`].
pub use concierge_config::{Config, ConfigBuilder};

// Domain vocabulary
pub use concierge_types::{
    ConciergeError, Degradation, GatewayError, Intent, LifecycleResult, LifecycleSignal,
    LifecycleStatus, ReviewAssessment, ReviewDecision, Sentiment, Stage, ToolError, TurnPhase,
    TurnReport,
};

/// Structured-logging initialization for binaries embedding the pipeline.
pub use concierge_types::logging;

// Gateway seam: implement `CompletionBackend` to bring your own provider,
// or use the scripted backend for tests and offline runs.
pub use concierge_gateway::{
    from_settings, CompletionBackend, CompletionRequest, CompletionResponse, Message, Role,
    ScriptedBackend, ToolCallRequest, ToolSpec,
};

// Tool and knowledge seams
pub use concierge_tools::{
    FrontDesk, KnowledgeStore, MemoryKnowledgeStore, Passage, Tool, ToolRegistry,
};

// Trace and metrics seams
pub use concierge_trace::{
    kv, LogTraceSink, MemoryTraceSink, MetricsRecorder, MetricsSummary, ScoreRecord, SpanHandle,
    SpanRecord, SpanStatus, TraceSink,
};

// Stage-level building blocks for embedders composing their own pipeline
pub use concierge_agents::{
    Classification, LifecycleAssessor, ReviewGate, ReviewInput, Router, SpecialistProfile,
};

// CLI implementation; exposed for white-box flag-parsing tests, not part of
// the stable API.
#[doc(hidden)]
pub mod cli;
