//! Tool trait and name-keyed registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use concierge_gateway::ToolSpec;
use concierge_types::ToolError;

use crate::billing_tools::{ApplyDiscount, GetBill, ProcessRefund};
use crate::booking_tools::{CancelBooking, CheckAvailability, CreateBooking, ModifyBooking};
use crate::front_desk::FrontDesk;
use crate::knowledge::{KnowledgeStore, SearchHotelInfo};

/// One invocable capability.
///
/// Implementations parse their own argument object and return a JSON payload
/// on success. Failures are structured [`ToolError`]s; the dispatcher renders
/// them back into the handler conversation as failure observations, so a tool
/// failure never aborts a turn.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration offered to the completion backend.
    fn spec(&self) -> ToolSpec;

    /// Run the tool against a parsed argument object.
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Deserialize a tool argument object into its typed input.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidInput {
        reason: format!("invalid arguments: {e}"),
    })
}

/// Encode a typed tool result as its JSON payload.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed {
        reason: format!("failed to encode tool payload: {e}"),
    })
}

/// Name-keyed tool registry.
///
/// Registration order does not matter; declarations are listed in name order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the eight builtin tools over the given store and
    /// knowledge source.
    #[must_use]
    pub fn builtin(
        front_desk: Arc<FrontDesk>,
        knowledge: Arc<dyn KnowledgeStore>,
        knowledge_top_k: usize,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CheckAvailability::new(front_desk.clone())));
        registry.register(Arc::new(CreateBooking::new(front_desk.clone())));
        registry.register(Arc::new(CancelBooking::new(front_desk.clone())));
        registry.register(Arc::new(ModifyBooking::new(front_desk.clone())));
        registry.register(Arc::new(GetBill::new(front_desk.clone())));
        registry.register(Arc::new(ProcessRefund::new(front_desk.clone())));
        registry.register(Arc::new(ApplyDiscount::new(front_desk)));
        registry.register(Arc::new(SearchHotelInfo::new(knowledge, knowledge_top_k)));
        registry
    }

    /// Register a tool under its declared name. Re-registering a name
    /// replaces the previous tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.spec().name, tool);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for an allowed subset of tools, in the order given.
    /// Names not present in the registry are skipped.
    #[must_use]
    pub fn specs_for(&self, names: &[&str]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|name| {
                let tool = self.tools.get(*name);
                if tool.is_none() {
                    debug!(tool = name, "Skipping unregistered tool in allowlist");
                }
                tool.map(|t| t.spec())
            })
            .collect()
    }

    /// Resolve and run one tool call.
    ///
    /// `arguments` is the raw argument text as sent by the provider; an
    /// empty string is treated as an empty object. The call is bounded by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// `ToolError::UnknownTool` for unregistered names,
    /// `ToolError::InvalidInput` when the argument text is not a JSON
    /// object, `ToolError::Timeout` when the deadline elapses, and whatever
    /// the tool itself returns.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &str,
        timeout: Duration,
    ) -> Result<Value, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        let parsed: Value = if arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidInput {
                reason: format!("arguments are not valid JSON: {e}"),
            })?
        };

        debug!(tool = name, "Invoking tool");
        let result = tokio::time::timeout(timeout, tool.invoke(parsed))
            .await
            .map_err(|_| ToolError::Timeout { duration: timeout })?;

        match &result {
            Ok(_) => debug!(tool = name, "Tool call completed"),
            Err(error) => warn!(tool = name, error = %error, "Tool call failed"),
        }
        result
    }
}
