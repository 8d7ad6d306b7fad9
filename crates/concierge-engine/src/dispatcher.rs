//! Specialist dispatch: the bounded tool loop.
//!
//! One run drives a single specialist profile against the gateway until the
//! model stops requesting tools or the iteration cap lands. Tool calls from
//! the same reply are dispatched concurrently and their results are fed
//! back in the order the model emitted them, so the conversation replayed
//! to the provider stays deterministic.

use std::sync::Arc;
use std::time::Duration;

use concierge_agents::SpecialistProfile;
use concierge_config::{Config, GatewaySettings, Policy, ToolSettings};
use concierge_gateway::{CompletionBackend, CompletionRequest, Message, ToolCallRequest};
use concierge_tools::ToolRegistry;
use concierge_trace::{kv, SpanHandle, SpanStatus, TraceSink};
use concierge_types::{ConciergeError, Stage, ToolError};
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Stand-in reply when a run ends with no usable draft text.
pub(crate) const APOLOGY_FALLBACK: &str = "I'm sorry, I couldn't process that request.";

/// What a specialist run produced.
#[derive(Debug)]
pub(crate) struct DispatchOutcome {
    /// Final (or best partial) response text.
    pub draft: String,
    /// Gateway round trips consumed.
    pub iterations: u32,
    /// Tool calls dispatched across all iterations.
    pub tool_invocations: u32,
    /// True when the loop hit the iteration cap before a final draft.
    pub cap_reached: bool,
    /// Passage text gathered from successful knowledge lookups, for the
    /// review gate's context section.
    pub knowledge_context: Option<String>,
}

/// Runs specialist profiles against the gateway and tool registry.
pub(crate) struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    registry: Arc<ToolRegistry>,
    model: String,
    call_timeout: Duration,
    tool_timeout: Duration,
    max_iterations: u32,
}

impl Dispatcher {
    pub(crate) fn new(
        backend: Arc<dyn CompletionBackend>,
        registry: Arc<ToolRegistry>,
        config: &Config,
    ) -> Self {
        let GatewaySettings {
            model,
            call_timeout,
            ..
        } = &config.gateway;
        let ToolSettings {
            call_timeout: tool_timeout,
            ..
        } = &config.tools;
        let Policy {
            max_tool_iterations,
            ..
        } = &config.policy;
        Self {
            backend,
            registry,
            model: model.clone(),
            call_timeout: *call_timeout,
            tool_timeout: *tool_timeout,
            max_iterations: *max_tool_iterations,
        }
    }

    /// Drives one specialist run to a draft.
    ///
    /// `conversation` is the prior transcript plus the guest's current
    /// message (and, on a revision run, the reviewer's rationale); the
    /// profile's system prompt is prepended here. Tool failures become
    /// failure observations in the conversation and the loop continues;
    /// only gateway errors and cancellation abort the run.
    ///
    /// # Errors
    ///
    /// `ConciergeError::Gateway` tagged with the specialist stage when a
    /// completion call fails, `ConciergeError::Cancelled` when the token
    /// fires at an iteration boundary.
    pub(crate) async fn run(
        &self,
        profile: &SpecialistProfile,
        conversation: &[Message],
        cancel: &CancellationToken,
        sink: &Arc<dyn TraceSink>,
        parent: SpanHandle,
    ) -> Result<DispatchOutcome, ConciergeError> {
        let specs = self.registry.specs_for(profile.allowed_tools);
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(profile.system_prompt));
        messages.extend_from_slice(conversation);

        let mut iterations = 0u32;
        let mut tool_invocations = 0u32;
        let mut last_text: Option<String> = None;
        let mut knowledge: Vec<String> = Vec::new();

        while iterations < self.max_iterations {
            if cancel.is_cancelled() {
                return Err(ConciergeError::Cancelled);
            }
            iterations += 1;

            let request =
                CompletionRequest::new(&self.model, self.call_timeout, messages.clone())
                    .with_tools(specs.clone())
                    .with_temperature(profile.temperature);
            let response = self
                .backend
                .complete(request)
                .await
                .map_err(|source| ConciergeError::gateway(Stage::Specialist, source))?;

            let text = response.content_text();
            if !text.trim().is_empty() {
                last_text = Some(text.to_string());
            }

            if !response.has_tool_calls() {
                let draft = match &response.content {
                    Some(content) if !content.trim().is_empty() => content.clone(),
                    _ => APOLOGY_FALLBACK.to_string(),
                };
                return Ok(DispatchOutcome {
                    draft,
                    iterations,
                    tool_invocations,
                    cap_reached: false,
                    knowledge_context: join_context(knowledge),
                });
            }

            let calls = response.tool_calls.clone();
            debug!(
                specialist = profile.intent.as_str(),
                iteration = iterations,
                calls = calls.len(),
                "Dispatching tool calls"
            );
            messages.push(Message::assistant_with_calls(
                response.content.clone().unwrap_or_default(),
                calls.clone(),
            ));

            tool_invocations += calls.len() as u32;
            let results = self.dispatch_calls(&calls, sink, parent).await;
            if cancel.is_cancelled() {
                // In-flight results are discarded, not surfaced.
                return Err(ConciergeError::Cancelled);
            }
            for (call, result) in calls.iter().zip(results) {
                match result {
                    Ok(value) => {
                        if call.name == "search_hotel_info" {
                            if let Some(text) = passage_text(&value) {
                                knowledge.push(text);
                            }
                        }
                        messages.push(Message::tool_result(&call.id, value.to_string()));
                    }
                    Err(error) => {
                        messages.push(Message::tool_result(&call.id, error.observation()));
                    }
                }
            }
        }

        warn!(
            specialist = profile.intent.as_str(),
            cap = self.max_iterations,
            "Tool iteration cap reached without a final draft"
        );
        Ok(DispatchOutcome {
            draft: last_text.unwrap_or_else(|| APOLOGY_FALLBACK.to_string()),
            iterations,
            tool_invocations,
            cap_reached: true,
            knowledge_context: join_context(knowledge),
        })
    }

    /// Runs one reply's tool calls concurrently. Each call gets its own
    /// span under `parent`; the returned vector is in emission order
    /// regardless of completion order.
    async fn dispatch_calls(
        &self,
        calls: &[ToolCallRequest],
        sink: &Arc<dyn TraceSink>,
        parent: SpanHandle,
    ) -> Vec<Result<Value, ToolError>> {
        let mut ordered: Vec<Option<Result<Value, ToolError>>> =
            (0..calls.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, call) in calls.iter().enumerate() {
            let span = sink.open_span(&call.name, Some(parent), vec![kv("call_id", &call.id)]);
            let registry = Arc::clone(&self.registry);
            let sink = Arc::clone(sink);
            let call = call.clone();
            let timeout = self.tool_timeout;
            tasks.spawn(async move {
                let result = registry.invoke(&call.name, &call.arguments, timeout).await;
                match &result {
                    Ok(_) => sink.close_span(span, SpanStatus::Ok, Vec::new()),
                    Err(error) => sink.close_span(
                        span,
                        SpanStatus::Error,
                        vec![kv("error", error.observation())],
                    ),
                }
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => ordered[index] = Some(result),
                Err(join_error) => {
                    warn!(error = %join_error, "Tool task aborted before completion");
                }
            }
        }

        ordered
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(ToolError::ExecutionFailed {
                        reason: "tool task aborted before completion".to_string(),
                    })
                })
            })
            .collect()
    }
}

/// Pulls the passage bodies out of a `search_hotel_info` payload.
fn passage_text(value: &Value) -> Option<String> {
    let passages = value.get("passages")?.as_array()?;
    let texts: Vec<&str> = passages
        .iter()
        .filter_map(|p| p.get("content").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn join_context(chunks: Vec<String>) -> Option<String> {
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}
