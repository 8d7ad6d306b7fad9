//! Quality gate over specialist drafts.
//!
//! Every draft passes through one reviewer call before it can reach the
//! guest. The reviewer either approves or asks for a revision, optionally
//! supplying an inline rewrite. A reply that cannot be parsed degrades to
//! an approval at the configured default score; a gateway failure here is
//! fatal to the turn, since the draft was never quality-checked.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use concierge_config::{GatewaySettings, Policy};
use concierge_gateway::extract::parse_json_reply;
use concierge_gateway::{CompletionBackend, CompletionRequest, Message};
use concierge_types::{ConciergeError, Intent, ReviewAssessment, ReviewDecision, Stage};

/// System prompt for the review call.
pub const REVIEW_SYSTEM_PROMPT: &str = r#"You are a quality review agent for Grand Horizon Hotel's AI customer care system.

Your job is to review the specialist agent's response BEFORE it reaches the guest.

## Review Checklist
1. **Accuracy**: Does the response contain correct information? Are prices, times, policies accurate?
2. **Hallucination Check**: Does the response make up information not in the context?
3. **Policy Compliance**: Does the response follow hotel policies (no unauthorized discounts, correct cancellation rules)?
4. **Tone**: Is the response warm, professional, and empathetic? Appropriate for a luxury hotel?
5. **Completeness**: Does the response fully address the guest's question?
6. **Safety**: Does the response avoid sharing sensitive data (credit cards, internal systems)?

Respond ONLY with a JSON object:
{
    "approved": true/false,
    "score": <1-10>,
    "issues": ["list of issues found, empty if none"],
    "suggestions": "brief improvement suggestion or null",
    "revised_response": "only if approved=false, provide a corrected version; null if approved"
}
"#;

/// One draft submitted for review.
#[derive(Debug, Clone)]
pub struct ReviewInput<'a> {
    pub guest_query: &'a str,
    pub draft: &'a str,
    pub intent: Intent,
    /// Knowledge passages gathered during the specialist run, if any.
    pub context: Option<&'a str>,
}

/// Reviewer reply as requested from the model.
///
/// `approved` is the verdict and must be present; everything else has a
/// usable default so a terse reviewer still parses.
#[derive(Debug, Deserialize)]
struct ReviewReply {
    approved: bool,
    score: Option<f64>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Option<String>,
    #[serde(default)]
    revised_response: Option<String>,
}

/// Reviewer stage in front of the guest-visible response.
pub struct ReviewGate {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    timeout: Duration,
    default_score: u8,
}

impl ReviewGate {
    #[must_use]
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        gateway: &GatewaySettings,
        policy: &Policy,
    ) -> Self {
        Self {
            backend,
            model: gateway.model.clone(),
            timeout: gateway.call_timeout,
            default_score: policy.review_default_score,
        }
    }

    /// Review one draft.
    ///
    /// # Errors
    ///
    /// Returns [`ConciergeError::Gateway`] when the completion call fails.
    /// Unparseable replies are not errors; they degrade to an approval with
    /// `parse_fallback` set.
    pub async fn evaluate(
        &self,
        input: &ReviewInput<'_>,
    ) -> Result<ReviewAssessment, ConciergeError> {
        let messages = vec![
            Message::system(REVIEW_SYSTEM_PROMPT),
            Message::user(review_input_text(input)),
        ];
        let request = CompletionRequest::new(&self.model, self.timeout, messages)
            .with_temperature(0.0);
        let response = self
            .backend
            .complete(request)
            .await
            .map_err(|source| ConciergeError::gateway(Stage::Review, source))?;

        Ok(parse_review(response.content_text(), self.default_score))
    }
}

/// Assemble the reviewer's user message.
fn review_input_text(input: &ReviewInput<'_>) -> String {
    format!(
        "## Guest Query\n{}\n\n\
         ## Agent Response (to review)\n{}\n\n\
         ## Intent Classification\n{}\n\n\
         ## Retrieved Context\n{}\n",
        input.guest_query,
        input.draft,
        input.intent,
        input.context.unwrap_or("No context retrieved"),
    )
}

/// Parse a reviewer reply, degrading to a default approval when unusable.
fn parse_review(raw: &str, default_score: u8) -> ReviewAssessment {
    let reply: ReviewReply = match parse_json_reply(raw) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(%err, "Reviewer reply did not parse, approving at the default score");
            return ReviewAssessment {
                decision: ReviewDecision::Approved,
                score: default_score,
                issues: Vec::new(),
                suggestions: None,
                revised_response: None,
                parse_fallback: true,
            };
        }
    };

    let score = reply
        .score
        .unwrap_or(f64::from(default_score))
        .clamp(1.0, 10.0)
        .round() as u8;
    let decision = if reply.approved {
        ReviewDecision::Approved
    } else {
        ReviewDecision::Revise
    };
    // An inline rewrite only means something on a revise verdict.
    let revised_response = match decision {
        ReviewDecision::Approved => None,
        ReviewDecision::Revise => non_blank(reply.revised_response),
    };

    ReviewAssessment {
        decision,
        score,
        issues: reply.issues,
        suggestions: non_blank(reply.suggestions),
        revised_response,
        parse_fallback: false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
