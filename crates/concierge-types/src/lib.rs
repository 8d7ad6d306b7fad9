//! Foundation types for the concierge pipeline.
//!
//! Everything the stage crates share lives here: the intent/sentiment/status
//! enums, the turn report returned to the API layer, the error taxonomy, and
//! tracing initialization. This crate has no knowledge of any concrete
//! gateway, tool, or trace backend.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{ConciergeError, ConfigError, GatewayError, ToolError};
pub use types::{
    Degradation, Intent, LifecycleResult, LifecycleSignal, LifecycleStatus, ReviewAssessment,
    ReviewDecision, Sentiment, Stage, TurnPhase, TurnReport,
};
