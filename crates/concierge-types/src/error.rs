use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::Stage;

/// Library-level error type for the concierge pipeline.
///
/// `ConciergeError` is the error returned by `process_turn` and the
/// collaborator constructors. It distinguishes the failure classes the API
/// layer cares about:
///
/// | Variant | Meaning | Retryable |
/// |---------|---------|-----------|
/// | `InvalidInput` | empty/malformed guest message | no |
/// | `Classification` | router could not produce a valid intent | yes |
/// | `Gateway` | completion capability failed at a fatal stage | per source |
/// | `Config` | configuration load/validation failure | no |
/// | `Cancelled` | turn cancellation token fired | no |
///
/// Policy-bounded conditions (iteration cap, review exhausted) are not
/// errors; they surface as [`Degradation`](crate::types::Degradation) flags
/// on an otherwise valid [`TurnReport`](crate::types::TurnReport).
///
/// # Exit Code Mapping
///
/// Use [`exit_code()`](Self::exit_code) from binaries:
///
/// | Exit Code | Error |
/// |-----------|-------|
/// | 2 | `InvalidInput`, `Config` |
/// | 3 | `Classification` |
/// | 4 | `Gateway` |
/// | 5 | `Cancelled` |
#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("intent classification failed: {reason}")]
    Classification { reason: String },

    #[error("model gateway failure during {stage}: {source}")]
    Gateway {
        stage: Stage,
        #[source]
        source: GatewayError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("turn cancelled")]
    Cancelled,
}

impl ConciergeError {
    /// Wrap a gateway failure with the stage it happened in.
    #[must_use]
    pub const fn gateway(stage: Stage, source: GatewayError) -> Self {
        Self::Gateway { stage, source }
    }

    /// Whether the API layer should advertise this failure as retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Classification { .. } => true,
            Self::Gateway { source, .. } => source.is_retryable(),
            Self::InvalidInput { .. } | Self::Config(_) | Self::Cancelled => false,
        }
    }

    /// Process exit code for CLI error reporting.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } | Self::Config(_) => 2,
            Self::Classification { .. } => 3,
            Self::Gateway { .. } => 4,
            Self::Cancelled => 5,
        }
    }
}

/// Failures of the completion capability behind the model gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider rejected the credentials")]
    Auth,

    #[error("provider quota or rate limit exhausted")]
    Quota,

    #[error("provider outage (HTTP {status})")]
    Outage { status: u16 },

    #[error("call timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("gateway misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Transient failures worth retrying on a fresh turn.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Quota | Self::Outage { .. } | Self::Timeout { .. }
        )
    }
}

/// Structured tool-call failures.
///
/// Always handler-recoverable: a tool failure never aborts a turn, only the
/// current tool iteration. The dispatcher renders these back to the handler
/// as failure observations instead of propagating them.
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("invalid tool input: {reason}")]
    InvalidInput { reason: String },

    #[error("tool execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("tool call timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl ToolError {
    /// Failure observation text fed back into the handler conversation.
    #[must_use]
    pub fn observation(&self) -> String {
        match self {
            Self::UnknownTool { name } => format!("Unknown tool: {name}"),
            other => format!("Tool error: {other}"),
        }
    }
}

/// Configuration load and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}
