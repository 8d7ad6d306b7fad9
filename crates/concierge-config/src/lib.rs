//! Configuration for the concierge pipeline.
//!
//! All policy knobs (loop caps, escalation thresholds, fallback behavior)
//! and collaborator settings (gateway provider, timeouts) live here. Nothing
//! in the stage crates hard-codes a bound; they receive resolved values from
//! [`Config`].

mod config;

pub use config::{
    Config, ConfigBuilder, GatewayFileTable, GatewaySettings, Policy, PolicyFileTable,
    ToolSettings, ToolsFileTable,
};
