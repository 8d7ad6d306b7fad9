//! Orchestration engine for the concierge pipeline.
//!
//! The [`Orchestrator`] drives each guest message through routing,
//! specialist dispatch, review, and lifecycle assessment, emitting spans
//! and scores along the way. The tool loop and the per-turn state machine
//! live here; the stage logic itself is in `concierge-agents`.

mod dispatcher;
mod orchestrator;
mod turn;

pub use orchestrator::{HealthSnapshot, Orchestrator, MAX_MESSAGE_CHARS};
