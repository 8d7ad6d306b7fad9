//! Lifecycle assessment stage.
//!
//! After the reviewed response is settled, one completion call reads the
//! interaction and reports status, sentiment, and follow-up signals. The
//! escalation decision itself never comes from the model: [`resolve`]
//! applies the deterministic rules over the turn's facts and OR-combines
//! them. This stage degrades instead of failing; a turn always completes
//! once a response exists.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use concierge_config::{GatewaySettings, Policy};
use concierge_gateway::extract::parse_json_reply;
use concierge_gateway::{CompletionBackend, CompletionRequest, Message, Role};
use concierge_types::{
    Intent, LifecycleResult, LifecycleSignal, LifecycleStatus, Sentiment,
};

/// System prompt for the assessment call.
pub const ASSESSOR_SYSTEM_PROMPT: &str = r#"You are the Project Manager agent for Grand Horizon Hotel's customer care system.

Your responsibilities:
1. ASSESS each guest interaction for urgency and complexity
2. TRACK resolution status - mark queries as in_progress, resolved, or escalated
3. NOTE signals a human reviewer should see: guest frustration, legal or safety
   concerns, financial disputes over $500, issues the specialist could not resolve
4. ENSURE SLA compliance - flag queries that need follow-up before they go stale

After the specialist agent responds, you provide a brief status assessment:
- Is the query resolved? Partially resolved? Needs follow-up?
- What is the overall guest sentiment?

Respond ONLY with a JSON object:
{
    "query_status": "resolved" | "in_progress" | "escalated",
    "guest_sentiment": "positive" | "neutral" | "negative",
    "follow_up_needed": true/false,
    "notes": "brief assessment"
}
"#;

/// How many transcript lines are quoted back to the assessor.
const CONTEXT_WINDOW: usize = 4;

/// Completed interaction handed to the assessor.
#[derive(Debug, Clone)]
pub struct AssessmentInput<'a> {
    /// Session transcript, oldest first; only the tail is quoted.
    pub history: &'a [Message],
    /// The reviewed response that will reach the guest.
    pub response: &'a str,
    pub intent: Intent,
    /// Handler label, e.g. `booking_agent`.
    pub agent_label: &'a str,
    pub session_id: &'a str,
}

/// Assessor reply as requested from the model. Every field defaults, so a
/// sparse reply still yields a usable signal.
#[derive(Debug, Deserialize)]
struct AssessorReply {
    #[serde(default)]
    query_status: String,
    #[serde(default)]
    guest_sentiment: String,
    #[serde(default)]
    follow_up_needed: bool,
    #[serde(default)]
    notes: Option<String>,
}

/// Post-response lifecycle stage.
pub struct LifecycleAssessor {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    timeout: Duration,
}

impl LifecycleAssessor {
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>, gateway: &GatewaySettings) -> Self {
        Self {
            backend,
            model: gateway.model.clone(),
            timeout: gateway.call_timeout,
        }
    }

    /// Obtain the model's read on the interaction.
    ///
    /// Never fails: a gateway failure or unusable reply returns the
    /// neutral fallback signal with `degraded` set, and the caller still
    /// applies [`resolve`].
    pub async fn signal(&self, input: &AssessmentInput<'_>) -> LifecycleSignal {
        let messages = vec![
            Message::system(ASSESSOR_SYSTEM_PROMPT),
            Message::user(assessment_input_text(input)),
        ];
        let request = CompletionRequest::new(&self.model, self.timeout, messages)
            .with_temperature(0.0);

        let response = match self.backend.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "Lifecycle assessment call failed, using neutral fallback");
                return degraded_signal();
            }
        };

        match parse_json_reply::<AssessorReply>(response.content_text()) {
            Ok(reply) => LifecycleSignal {
                status_suggestion: LifecycleStatus::parse(&reply.query_status)
                    .unwrap_or(LifecycleStatus::Resolved),
                sentiment: Sentiment::parse(&reply.guest_sentiment).unwrap_or(Sentiment::Neutral),
                follow_up_needed: reply.follow_up_needed,
                notes: reply.notes.filter(|s| !s.trim().is_empty()),
                degraded: false,
            },
            Err(err) => {
                warn!(%err, "Lifecycle assessment reply did not parse, using neutral fallback");
                degraded_signal()
            }
        }
    }
}

fn degraded_signal() -> LifecycleSignal {
    let mut signal = LifecycleSignal::fallback();
    signal.notes = Some("Assessment unavailable".to_string());
    signal
}

/// Assemble the assessor's user message.
fn assessment_input_text(input: &AssessmentInput<'_>) -> String {
    let lines: Vec<String> = input
        .history
        .iter()
        .filter_map(|msg| match msg.role {
            Role::User => Some(format!("Guest: {}", msg.content)),
            Role::Assistant => Some(format!("Agent: {}", msg.content)),
            _ => None,
        })
        .collect();
    let tail = &lines[lines.len().saturating_sub(CONTEXT_WINDOW)..];

    format!(
        "## Conversation Context\n{}\n\n\
         ## Specialist Response\n{}\n\n\
         ## Query Details\n\
         - Intent: {}\n\
         - Agent used: {}\n\
         - Session: {}\n",
        tail.join("\n"),
        input.response,
        input.intent,
        input.agent_label,
        input.session_id,
    )
}

/// Turn facts the deterministic escalation rules run over.
#[derive(Debug, Clone, Copy)]
pub struct EscalationFacts {
    /// Router confidence for the turn's intent.
    pub confidence: f64,
    /// True when the review budget ran out without an approval.
    pub review_exhausted: bool,
    pub intent: Intent,
    /// Last review score on the 1-10 scale.
    pub review_score: u8,
}

/// Apply the escalation rules and produce the final lifecycle outcome.
///
/// Four independent conditions, OR-combined: low router confidence,
/// exhausted review, negative sentiment, and a complaint scored below the
/// review floor. When any fires, the status is `Escalated` and the reason
/// names every condition that did. The model can suggest `escalated` but
/// never decide it: with no rule firing, that suggestion downgrades to
/// `in_progress` with the follow-up flag set.
#[must_use]
pub fn resolve(
    signal: &LifecycleSignal,
    facts: &EscalationFacts,
    policy: &Policy,
) -> LifecycleResult {
    let mut reasons = Vec::new();
    if facts.confidence < policy.escalation_confidence_floor {
        reasons.push(format!(
            "router confidence {:.2} below the {:.2} floor",
            facts.confidence, policy.escalation_confidence_floor
        ));
    }
    if facts.review_exhausted {
        reasons.push("review budget exhausted without approval".to_string());
    }
    if signal.sentiment == Sentiment::Negative {
        reasons.push("guest sentiment is negative".to_string());
    }
    if facts.intent == Intent::Complaint && facts.review_score < policy.complaint_review_floor {
        reasons.push(format!(
            "complaint scored {}, below the review floor of {}",
            facts.review_score, policy.complaint_review_floor
        ));
    }

    let escalated = !reasons.is_empty();
    let (status, follow_up_needed) = if escalated {
        (LifecycleStatus::Escalated, signal.follow_up_needed)
    } else {
        match signal.status_suggestion {
            LifecycleStatus::Escalated => (LifecycleStatus::InProgress, true),
            suggestion => (suggestion, signal.follow_up_needed),
        }
    };

    LifecycleResult {
        status,
        sentiment: signal.sentiment,
        escalated,
        escalation_reason: escalated.then(|| reasons.join("; ")),
        follow_up_needed,
        notes: signal.notes.clone(),
    }
}
