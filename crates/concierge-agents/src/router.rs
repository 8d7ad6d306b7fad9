//! Intent classification stage.
//!
//! The router asks the completion backend to place a guest message in one
//! of the five [`Intent`] categories and returns the label with a
//! confidence. It never silently defaults the intent: an unusable reply is
//! a classification failure unless the `fallback_to_general` policy flag
//! explicitly opts into the low-confidence fallback.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use concierge_config::{GatewaySettings, Policy};
use concierge_gateway::extract::parse_json_reply;
use concierge_gateway::{CompletionBackend, CompletionRequest, Message};
use concierge_types::{ConciergeError, Intent, Stage};

/// System prompt for the classification call.
pub const ROUTER_SYSTEM_PROMPT: &str = r#"You are the intent classification router for Grand Horizon Hotel's customer care system.

Classify the guest's message into exactly ONE of these intents:

- **booking**: Reservations, room availability, check-in/check-out, cancellations, modifications
- **amenities**: Room features, hotel facilities (pool, gym, spa, restaurant, Wi-Fi), services info
- **billing**: Charges, payments, refunds, invoices, promo codes, billing disputes
- **complaint**: Problems, issues, dissatisfaction, broken items, noise, staff complaints, escalation requests
- **general**: FAQs, loyalty program, parking, directions, events, anything that doesn't fit above

Respond ONLY with a JSON object:
{
    "intent": "booking" | "amenities" | "billing" | "complaint" | "general",
    "confidence": <0.0-1.0>,
    "reasoning": "brief explanation of why this intent was chosen"
}
"#;

/// Confidence assumed when the reply omits the field.
const IMPLIED_CONFIDENCE: f64 = 0.8;

/// Outcome of a routing call.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    /// Reported confidence, clamped to [0, 1].
    pub confidence: f64,
    /// Model's short justification, recorded as a span attribute.
    pub reasoning: String,
    /// True when the policy fallback produced this classification instead
    /// of a usable model reply.
    pub fallback: bool,
}

/// Classifier reply as requested from the model.
#[derive(Debug, Deserialize)]
struct RouterReply {
    intent: String,
    #[serde(default = "implied_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

fn implied_confidence() -> f64 {
    IMPLIED_CONFIDENCE
}

/// Intent classification front of the pipeline.
pub struct Router {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    timeout: Duration,
    fallback_to_general: bool,
    fallback_confidence: f64,
}

impl Router {
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
            fallback_to_general: policy.fallback_to_general,
            fallback_confidence: policy.fallback_confidence,
        }
    }

    /// Classify a guest message.
    ///
    /// `history` is the prior session transcript, included so follow-up
    /// messages ("cancel that instead") classify against their context.
    ///
    /// # Errors
    ///
    /// Returns [`ConciergeError::Gateway`] when the completion call fails,
    /// and [`ConciergeError::Classification`] when the reply is unusable
    /// and the fallback flag is off.
    pub async fn classify(
        &self,
        message: &str,
        history: &[Message],
    ) -> Result<Classification, ConciergeError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(ROUTER_SYSTEM_PROMPT));
        messages.extend_from_slice(history);
        messages.push(Message::user(message));

        let request = CompletionRequest::new(&self.model, self.timeout, messages)
            .with_temperature(0.0);
        let response = self
            .backend
            .complete(request)
            .await
            .map_err(|source| ConciergeError::gateway(Stage::Router, source))?;

        match parse_classification(response.content_text()) {
            Ok(classification) => Ok(classification),
            Err(reason) => self.fall_back(reason),
        }
    }

    fn fall_back(&self, reason: String) -> Result<Classification, ConciergeError> {
        if !self.fallback_to_general {
            return Err(ConciergeError::Classification { reason });
        }
        warn!(%reason, "Classification failed, falling back to general intent");
        Ok(Classification {
            intent: Intent::General,
            confidence: self.fallback_confidence,
            reasoning: format!("Fallback after classification failure: {reason}"),
            fallback: true,
        })
    }
}

/// Parse a classifier reply into a [`Classification`].
///
/// The error string describes what was wrong with the reply; the caller
/// turns it into a failure or a policy fallback.
fn parse_classification(raw: &str) -> Result<Classification, String> {
    let reply: RouterReply =
        parse_json_reply(raw).map_err(|err| format!("reply is not valid router JSON: {err}"))?;
    let intent = Intent::parse(&reply.intent)
        .ok_or_else(|| format!("unknown intent label '{}'", reply.intent))?;

    Ok(Classification {
        intent,
        confidence: reply.confidence.clamp(0.0, 1.0),
        reasoning: reply.reasoning,
        fallback: false,
    })
}
