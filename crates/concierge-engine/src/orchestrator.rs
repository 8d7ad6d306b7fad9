//! Turn orchestration.
//!
//! [`Orchestrator`] owns the four-stage pipeline: route the guest message,
//! run the matching specialist through the tool loop, gate the draft
//! through review, then assess lifecycle and apply the escalation rules.
//! Every collaborator is injected at construction, so the same pipeline
//! runs against the live gateway or a scripted one without code changes.
//!
//! One turn emits one root span with a child span per executed stage, and
//! the per-turn scores are recorded against a fresh correlation id. Turns
//! within a session are serialized; distinct sessions proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Instant;

use concierge_agents::{
    lifecycle, AssessmentInput, EscalationFacts, LifecycleAssessor, ReviewGate, ReviewInput,
    Router, SpecialistProfile,
};
use concierge_config::Config;
use concierge_gateway::{CompletionBackend, Message};
use concierge_tools::{KnowledgeStore, ToolRegistry};
use concierge_trace::{kv, MetricsRecorder, SpanHandle, SpanStatus, TraceSink};
use concierge_types::{ConciergeError, Degradation, ReviewAssessment, TurnPhase, TurnReport};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::turn::TurnState;

/// Longest guest message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2_000;

const TURN_SPAN: &str = "turn";
const ROUTER_SPAN: &str = "router";
const REVIEW_SPAN: &str = "review";
const LIFECYCLE_SPAN: &str = "pm_assessment";

/// Point-in-time operational snapshot for the health surface.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub gateway_provider: String,
    pub model: String,
    pub registered_tools: usize,
    pub knowledge_documents: usize,
}

/// Per-session turn gates. Leases are created on first use and kept for
/// the life of the orchestrator.
#[derive(Default)]
struct SessionLocks {
    inner: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    fn lease(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut table = self.inner.lock().expect("session table poisoned");
        Arc::clone(table.entry(session_id.to_string()).or_default())
    }
}

/// Borrowed per-turn inputs threaded through the pipeline stages.
struct TurnCtx<'a> {
    session_id: &'a str,
    message: &'a str,
    prior_context: &'a [Message],
    cancel: &'a CancellationToken,
    correlation_id: &'a str,
    root: SpanHandle,
}

/// The pipeline driver. Construct once, share behind an `Arc`, call
/// [`Orchestrator::process_turn`] per guest message.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    knowledge: Arc<dyn KnowledgeStore>,
    sink: Arc<dyn TraceSink>,
    metrics: Arc<MetricsRecorder>,
    config: Config,
    router: Router,
    review: ReviewGate,
    lifecycle: LifecycleAssessor,
    dispatcher: Dispatcher,
    sessions: SessionLocks,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        registry: Arc<ToolRegistry>,
        knowledge: Arc<dyn KnowledgeStore>,
        sink: Arc<dyn TraceSink>,
        metrics: Arc<MetricsRecorder>,
        config: Config,
    ) -> Self {
        let router = Router::new(Arc::clone(&backend), &config.gateway, &config.policy);
        let review = ReviewGate::new(Arc::clone(&backend), &config.gateway, &config.policy);
        let lifecycle = LifecycleAssessor::new(Arc::clone(&backend), &config.gateway);
        let dispatcher = Dispatcher::new(backend, Arc::clone(&registry), &config);
        Self {
            registry,
            knowledge,
            sink,
            metrics,
            config,
            router,
            review,
            lifecycle,
            dispatcher,
            sessions: SessionLocks::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Operational snapshot: which gateway is wired and what capabilities
    /// the turn pipeline can reach.
    #[must_use]
    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            gateway_provider: self.config.gateway.provider.clone(),
            model: self.config.gateway.model.clone(),
            registered_tools: self.registry.len(),
            knowledge_documents: self.knowledge.document_count(),
        }
    }

    /// Processes one guest message to a final [`TurnReport`].
    ///
    /// `prior_context` is the session transcript so far, oldest first.
    ///
    /// # Errors
    ///
    /// [`ConciergeError::InvalidInput`] on an empty or oversized message,
    /// [`ConciergeError::Classification`] when routing fails with the
    /// fallback flag off, and [`ConciergeError::Gateway`] when a router,
    /// specialist, or review call fails. Lifecycle assessment never fails
    /// the turn.
    pub async fn process_turn(
        &self,
        session_id: &str,
        message: &str,
        prior_context: &[Message],
    ) -> Result<TurnReport, ConciergeError> {
        let cancel = CancellationToken::new();
        self.process_turn_cancellable(session_id, message, prior_context, &cancel)
            .await
    }

    /// [`Orchestrator::process_turn`] with a caller-held cancellation
    /// token. Cancellation is observed between stages and at tool-loop
    /// iteration boundaries; a cancelled turn fails with
    /// [`ConciergeError::Cancelled`].
    pub async fn process_turn_cancellable(
        &self,
        session_id: &str,
        message: &str,
        prior_context: &[Message],
        cancel: &CancellationToken,
    ) -> Result<TurnReport, ConciergeError> {
        validate_message(message)?;

        let lease = self.sessions.lease(session_id);
        let _turn_guard = lease.lock().await;

        let started = Instant::now();
        let correlation_id = Uuid::new_v4().to_string();
        let root = self.sink.open_span(
            TURN_SPAN,
            None,
            vec![
                kv("session_id", session_id),
                kv("correlation_id", &correlation_id),
            ],
        );
        info!(session = session_id, correlation = %correlation_id, "Turn started");

        let ctx = TurnCtx {
            session_id,
            message,
            prior_context,
            cancel,
            correlation_id: &correlation_id,
            root,
        };
        let mut state = TurnState::new();
        let result = self.run_pipeline(&ctx, &mut state).await;

        let latency = started.elapsed();
        match &result {
            Ok(report) => {
                let mut attributes = vec![
                    kv("phase", state.phase().as_str()),
                    kv("intent", report.intent.as_str()),
                    kv("escalated", report.escalated.to_string()),
                ];
                if report.is_degraded() {
                    attributes.push(kv("degradations", degradation_list(&report.degradations)));
                }
                self.sink.close_span(root, SpanStatus::Ok, attributes);
                self.sink.record_score(
                    &correlation_id,
                    "latency_ms",
                    latency.as_millis() as f64,
                    None,
                );
                self.metrics.record_turn(report, latency);
                info!(
                    session = session_id,
                    intent = report.intent.as_str(),
                    escalated = report.escalated,
                    latency_ms = latency.as_millis() as u64,
                    "Turn complete"
                );
            }
            Err(error) => {
                state.advance(TurnPhase::Failed);
                self.sink.close_span(
                    root,
                    SpanStatus::Error,
                    vec![
                        kv("phase", state.phase().as_str()),
                        kv("error", error.to_string()),
                    ],
                );
                warn!(session = session_id, error = %error, "Turn failed");
            }
        }
        result
    }

    async fn run_pipeline(
        &self,
        ctx: &TurnCtx<'_>,
        state: &mut TurnState,
    ) -> Result<TurnReport, ConciergeError> {
        ensure_live(ctx.cancel)?;

        let span = self.sink.open_span(ROUTER_SPAN, Some(ctx.root), Vec::new());
        let classification = match self.router.classify(ctx.message, ctx.prior_context).await {
            Ok(classification) => {
                self.sink.close_span(
                    span,
                    SpanStatus::Ok,
                    vec![
                        kv("intent", classification.intent.as_str()),
                        kv("confidence", format!("{:.2}", classification.confidence)),
                        kv("fallback", classification.fallback.to_string()),
                    ],
                );
                classification
            }
            Err(error) => {
                self.close_failed(span, &error);
                return Err(error);
            }
        };
        self.sink.record_score(
            ctx.correlation_id,
            "router_confidence",
            classification.confidence,
            Some(&classification.reasoning),
        );
        debug!(
            intent = classification.intent.as_str(),
            confidence = classification.confidence,
            "Message routed"
        );

        let profile = SpecialistProfile::for_intent(classification.intent);
        state.advance(TurnPhase::SpecialistActive);

        // The guest-visible transcript, used for lifecycle assessment.
        // The working conversation additionally carries revision exchanges,
        // which stay internal to the turn.
        let mut transcript: Vec<Message> = ctx.prior_context.to_vec();
        transcript.push(Message::user(ctx.message));
        let mut conversation = transcript.clone();

        let (draft, assessment) = loop {
            ensure_live(ctx.cancel)?;
            let run = state.record_specialist_run();

            let span = self
                .sink
                .open_span(&profile.span_name(), Some(ctx.root), Vec::new());
            let outcome = match self
                .dispatcher
                .run(profile, &conversation, ctx.cancel, &self.sink, span)
                .await
            {
                Ok(outcome) => {
                    self.sink.close_span(
                        span,
                        SpanStatus::Ok,
                        vec![
                            kv("iterations", outcome.iterations.to_string()),
                            kv("tool_calls", outcome.tool_invocations.to_string()),
                            kv("cap_reached", outcome.cap_reached.to_string()),
                        ],
                    );
                    outcome
                }
                Err(error) => {
                    self.close_failed(span, &error);
                    return Err(error);
                }
            };
            if outcome.cap_reached {
                state.mark_degraded(Degradation::IterationCapReached);
            }
            let draft = outcome.draft;

            ensure_live(ctx.cancel)?;
            state.advance(TurnPhase::ReviewPending);
            let span = self.sink.open_span(REVIEW_SPAN, Some(ctx.root), Vec::new());
            let input = ReviewInput {
                guest_query: ctx.message,
                draft: &draft,
                intent: classification.intent,
                context: outcome.knowledge_context.as_deref(),
            };
            let mut assessment = match self.review.evaluate(&input).await {
                Ok(assessment) => {
                    self.sink.close_span(
                        span,
                        SpanStatus::Ok,
                        vec![
                            kv("approved", assessment.approved().to_string()),
                            kv("score", assessment.score.to_string()),
                            kv("parse_fallback", assessment.parse_fallback.to_string()),
                        ],
                    );
                    assessment
                }
                Err(error) => {
                    self.close_failed(span, &error);
                    return Err(error);
                }
            };

            if assessment.approved() {
                break (draft, assessment);
            }
            if state.rewrites_used() < self.config.policy.max_review_rewrites {
                if let Some(rewrite) = assessment.revised_response.take() {
                    state.record_rewrite();
                    debug!(
                        score = assessment.score,
                        "Draft rejected; applying the reviewer's inline rewrite"
                    );
                    break (rewrite, assessment);
                }
            }
            if run >= self.config.policy.max_specialist_runs {
                warn!(
                    runs = run,
                    score = assessment.score,
                    "Review budget exhausted; releasing the last draft as-is"
                );
                state.mark_degraded(Degradation::ReviewExhausted);
                break (draft, assessment);
            }

            state.advance(TurnPhase::Revision);
            debug!(
                score = assessment.score,
                "Draft rejected; re-running the specialist with the rationale"
            );
            conversation.push(Message::assistant(draft.as_str()));
            conversation.push(Message::user(revision_request(&assessment)));
            state.advance(TurnPhase::SpecialistActive);
        };

        ensure_live(ctx.cancel)?;
        state.advance(TurnPhase::LifecycleAssessment);
        let span = self
            .sink
            .open_span(LIFECYCLE_SPAN, Some(ctx.root), Vec::new());
        let agent_label = profile.agent_label();
        let assessment_input = AssessmentInput {
            history: &transcript,
            response: &draft,
            intent: classification.intent,
            agent_label: &agent_label,
            session_id: ctx.session_id,
        };
        let signal = self.lifecycle.signal(&assessment_input).await;
        let facts = EscalationFacts {
            confidence: classification.confidence,
            review_exhausted: state.review_exhausted(),
            intent: classification.intent,
            review_score: assessment.score,
        };
        let outcome = lifecycle::resolve(&signal, &facts, &self.config.policy);
        self.sink.close_span(
            span,
            SpanStatus::Ok,
            vec![
                kv("status", outcome.status.as_str()),
                kv("sentiment", outcome.sentiment.as_str()),
                kv("escalated", outcome.escalated.to_string()),
                kv("degraded", signal.degraded.to_string()),
            ],
        );

        self.sink.record_score(
            ctx.correlation_id,
            "review_score",
            f64::from(assessment.score) / 10.0,
            None,
        );
        self.sink.record_score(
            ctx.correlation_id,
            "escalated",
            if outcome.escalated { 1.0 } else { 0.0 },
            outcome.escalation_reason.as_deref(),
        );
        self.sink.record_score(
            ctx.correlation_id,
            "guest_sentiment",
            outcome.sentiment.score(),
            None,
        );

        state.advance(TurnPhase::Complete);
        Ok(TurnReport {
            correlation_id: ctx.correlation_id.to_string(),
            session_id: ctx.session_id.to_string(),
            final_response: draft,
            intent: classification.intent,
            confidence: classification.confidence,
            specialist_used: agent_label,
            lifecycle_status: outcome.status,
            sentiment: outcome.sentiment,
            escalated: outcome.escalated,
            review_score: assessment.score,
            degradations: state.degradations().to_vec(),
            follow_up_needed: outcome.follow_up_needed,
        })
    }

    fn close_failed(&self, span: SpanHandle, error: &ConciergeError) {
        self.sink
            .close_span(span, SpanStatus::Error, vec![kv("error", error.to_string())]);
    }
}

fn validate_message(message: &str) -> Result<(), ConciergeError> {
    if message.trim().is_empty() {
        return Err(ConciergeError::InvalidInput {
            reason: "message must not be empty".to_string(),
        });
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(ConciergeError::InvalidInput {
            reason: format!("message is {chars} characters, over the {MAX_MESSAGE_CHARS} limit"),
        });
    }
    Ok(())
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), ConciergeError> {
    if cancel.is_cancelled() {
        Err(ConciergeError::Cancelled)
    } else {
        Ok(())
    }
}

/// Instruction appended to the working conversation before a revision run.
fn revision_request(assessment: &ReviewAssessment) -> String {
    format!(
        "A quality reviewer rejected that draft. {}\nWrite an improved response to the guest's request.",
        assessment.rationale()
    )
}

fn degradation_list(degradations: &[Degradation]) -> String {
    degradations
        .iter()
        .map(Degradation::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_gateway::ScriptedBackend;
    use concierge_tools::{FrontDesk, MemoryKnowledgeStore};
    use concierge_trace::MemoryTraceSink;
    use concierge_types::{Intent, LifecycleStatus, Sentiment};

    struct Harness {
        backend: Arc<ScriptedBackend>,
        sink: Arc<MemoryTraceSink>,
        metrics: Arc<MetricsRecorder>,
        orchestrator: Orchestrator,
    }

    fn harness() -> Harness {
        harness_with(Config::default())
    }

    fn harness_with(config: Config) -> Harness {
        let backend = Arc::new(ScriptedBackend::new());
        let sink = Arc::new(MemoryTraceSink::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let knowledge = Arc::new(MemoryKnowledgeStore::seeded());
        let registry = Arc::new(ToolRegistry::builtin(
            Arc::new(FrontDesk::seeded()),
            Arc::clone(&knowledge) as Arc<dyn KnowledgeStore>,
            3,
        ));
        let orchestrator = Orchestrator::new(
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            registry,
            knowledge,
            Arc::clone(&sink) as Arc<dyn TraceSink>,
            Arc::clone(&metrics),
            config,
        );
        Harness {
            backend,
            sink,
            metrics,
            orchestrator,
        }
    }

    fn push_router(harness: &Harness, intent: &str, confidence: f64) {
        harness.backend.push_text(format!(
            r#"{{"intent": "{intent}", "confidence": {confidence}, "reasoning": "test routing"}}"#
        ));
    }

    fn push_review_approval(harness: &Harness, score: u8) {
        harness.backend.push_text(format!(
            r#"{{"approved": true, "score": {score}, "issues": []}}"#
        ));
    }

    fn push_review_rejection(harness: &Harness, score: u8) {
        harness.backend.push_text(format!(
            r#"{{"approved": false, "score": {score}, "issues": ["Too vague"], "suggestions": "Name the hours"}}"#
        ));
    }

    fn push_assessor(harness: &Harness, status: &str, sentiment: &str) {
        harness.backend.push_text(format!(
            r#"{{"query_status": "{status}", "guest_sentiment": "{sentiment}", "follow_up_needed": false}}"#
        ));
    }

    #[tokio::test]
    async fn happy_path_produces_a_complete_report() {
        let h = harness();
        push_router(&h, "amenities", 0.92);
        h.backend.push_text("The spa is open 9am to 8pm daily.");
        push_review_approval(&h, 8);
        push_assessor(&h, "resolved", "positive");

        let report = h
            .orchestrator
            .process_turn("sess-1", "When does the spa open?", &[])
            .await
            .unwrap();

        assert_eq!(report.session_id, "sess-1");
        assert_eq!(report.intent, Intent::Amenities);
        assert_eq!(report.confidence, 0.92);
        assert_eq!(report.final_response, "The spa is open 9am to 8pm daily.");
        assert_eq!(report.specialist_used, "amenities_agent");
        assert_eq!(report.lifecycle_status, LifecycleStatus::Resolved);
        assert_eq!(report.sentiment, Sentiment::Positive);
        assert!(!report.escalated);
        assert_eq!(report.review_score, 8);
        assert!(report.degradations.is_empty());
        assert!(!report.follow_up_needed);
        assert_eq!(h.backend.remaining(), 0);
    }

    #[tokio::test]
    async fn happy_path_emits_one_span_per_stage_and_all_scores() {
        let h = harness();
        push_router(&h, "amenities", 0.92);
        h.backend.push_text("The spa is open 9am to 8pm daily.");
        push_review_approval(&h, 8);
        push_assessor(&h, "resolved", "positive");

        let report = h
            .orchestrator
            .process_turn("sess-1", "When does the spa open?", &[])
            .await
            .unwrap();

        for name in ["turn", "router", "specialist_amenities", "review", "pm_assessment"] {
            assert_eq!(h.sink.spans_named(name).len(), 1, "span {name}");
        }
        assert_eq!(h.sink.open_span_count(), 0);

        let cid = &report.correlation_id;
        assert_eq!(h.sink.score_value(cid, "router_confidence"), Some(0.92));
        assert_eq!(h.sink.score_value(cid, "review_score"), Some(0.8));
        assert_eq!(h.sink.score_value(cid, "escalated"), Some(0.0));
        assert_eq!(h.sink.score_value(cid, "guest_sentiment"), Some(1.0));
        assert!(h.sink.score_value(cid, "latency_ms").is_some());

        let summary = h.metrics.summary();
        assert_eq!(summary.turns_total, 1);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_gateway_call() {
        let h = harness();
        h.backend.push_text("never consumed");

        let error = h
            .orchestrator
            .process_turn("sess-1", "   ", &[])
            .await
            .unwrap_err();

        assert!(matches!(error, ConciergeError::InvalidInput { .. }));
        assert_eq!(h.backend.remaining(), 1);
        assert!(h.sink.finished_spans().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let h = harness();
        let message = "x".repeat(MAX_MESSAGE_CHARS + 1);

        let error = h
            .orchestrator
            .process_turn("sess-1", &message, &[])
            .await
            .unwrap_err();

        assert!(matches!(error, ConciergeError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn rejection_without_rewrite_reruns_the_specialist() {
        let h = harness();
        push_router(&h, "amenities", 0.9);
        h.backend.push_text("We have a pool.");
        push_review_rejection(&h, 4);
        h.backend.push_text("The pool is open 7am to 10pm, towels provided.");
        push_review_approval(&h, 9);
        push_assessor(&h, "resolved", "neutral");

        let report = h
            .orchestrator
            .process_turn("sess-1", "Pool hours?", &[])
            .await
            .unwrap();

        assert_eq!(
            report.final_response,
            "The pool is open 7am to 10pm, towels provided."
        );
        assert_eq!(report.review_score, 9);
        assert!(report.degradations.is_empty());
        assert_eq!(h.sink.spans_named("specialist_amenities").len(), 2);
        assert_eq!(h.sink.spans_named("review").len(), 2);

        // The revision run sees the rejected draft and the rationale.
        let revision_request = &h.backend.requests()[3];
        let last = revision_request.messages.last().unwrap();
        assert!(last.content.contains("Too vague"));
        assert!(last.content.contains("Name the hours"));
    }

    #[tokio::test]
    async fn inline_rewrite_replaces_the_draft_without_a_rerun() {
        let h = harness();
        push_router(&h, "billing", 0.88);
        h.backend.push_text("Your bill is fine.");
        h.backend.push_text(
            r#"{"approved": false, "score": 5, "issues": ["Unhelpful"], "revised_response": "Your current balance is $420.50; the detailed folio is at the front desk."}"#,
        );
        push_assessor(&h, "in_progress", "neutral");

        let report = h
            .orchestrator
            .process_turn("sess-1", "Can you check my bill?", &[])
            .await
            .unwrap();

        assert_eq!(
            report.final_response,
            "Your current balance is $420.50; the detailed folio is at the front desk."
        );
        assert_eq!(h.sink.spans_named("specialist_billing").len(), 1);
        assert_eq!(h.sink.spans_named("review").len(), 1);
        assert!(report.degradations.is_empty());
        assert_eq!(report.review_score, 5);
    }

    #[tokio::test]
    async fn exhausted_review_forces_the_last_draft_out() {
        let h = harness();
        push_router(&h, "amenities", 0.9);
        h.backend.push_text("Draft one.");
        push_review_rejection(&h, 4);
        h.backend.push_text("Draft two.");
        push_review_rejection(&h, 4);
        push_assessor(&h, "in_progress", "neutral");

        let report = h
            .orchestrator
            .process_turn("sess-1", "Pool hours?", &[])
            .await
            .unwrap();

        assert_eq!(report.final_response, "Draft two.");
        assert!(report.degradations.contains(&Degradation::ReviewExhausted));
        // Exhausted review is one of the deterministic escalation rules.
        assert!(report.escalated);
        assert_eq!(report.lifecycle_status, LifecycleStatus::Escalated);
        assert_eq!(h.sink.spans_named("specialist_amenities").len(), 2);
    }

    #[tokio::test]
    async fn router_failure_fails_the_turn_and_closes_spans() {
        let h = harness();
        h.backend.push_text("not a classification");

        let error = h
            .orchestrator
            .process_turn("sess-1", "Hello", &[])
            .await
            .unwrap_err();

        assert!(matches!(error, ConciergeError::Classification { .. }));
        assert_eq!(h.sink.open_span_count(), 0);
        let turn = &h.sink.spans_named("turn")[0];
        assert_eq!(turn.status, SpanStatus::Error);
        assert_eq!(turn.attribute("phase"), Some("failed"));
        let summary = h.metrics.summary();
        assert_eq!(summary.turns_total, 0);
    }

    #[tokio::test]
    async fn cancelled_token_fails_the_turn_before_routing() {
        let h = harness();
        h.backend.push_text("never consumed");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = h
            .orchestrator
            .process_turn_cancellable("sess-1", "Hello", &[], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(error, ConciergeError::Cancelled));
        assert_eq!(h.backend.remaining(), 1);
        assert_eq!(h.sink.open_span_count(), 0);
    }

    #[tokio::test]
    async fn prior_context_reaches_router_and_assessor() {
        let h = harness();
        push_router(&h, "booking", 0.85);
        h.backend.push_text("Your reservation is confirmed for March 10.");
        push_review_approval(&h, 8);
        push_assessor(&h, "resolved", "positive");

        let prior = vec![
            Message::user("I'd like a deluxe room."),
            Message::assistant("Certainly, for which dates?"),
        ];
        h.orchestrator
            .process_turn("sess-1", "March 10 to 12.", &prior)
            .await
            .unwrap();

        let requests = h.backend.requests();
        // Router: system + two prior turns + the new message.
        assert_eq!(requests[0].messages.len(), 4);
        // Assessor quotes the transcript tail.
        let assessor_body = &requests[3].messages[1].content;
        assert!(assessor_body.contains("Guest: I'd like a deluxe room."));
        assert!(assessor_body.contains("Guest: March 10 to 12."));
    }

    #[tokio::test]
    async fn turns_on_one_session_are_serialized() {
        let h = harness();
        for _ in 0..2 {
            push_router(&h, "general", 0.9);
            h.backend.push_text("Happy to help.");
            push_review_approval(&h, 8);
            push_assessor(&h, "resolved", "neutral");
        }

        let (first, second) = tokio::join!(
            h.orchestrator.process_turn("sess-1", "First question", &[]),
            h.orchestrator.process_turn("sess-1", "Second question", &[]),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(h.backend.remaining(), 0);
        assert_eq!(h.metrics.summary().turns_total, 2);
    }

    #[tokio::test]
    async fn health_reports_wiring() {
        let h = harness();
        let health = h.orchestrator.health();
        assert_eq!(health.gateway_provider, "openai");
        assert_eq!(health.model, "gpt-4o-mini");
        assert_eq!(health.registered_tools, 8);
        assert_eq!(health.knowledge_documents, 4);
    }
}
