//! Full-pipeline integration scenarios over the scripted gateway.
//!
//! Every test drives a complete turn: routing, specialist tool loop, review
//! gate, lifecycle assessment. The scripted backend supplies the model
//! replies in order; the seeded front-desk store answers the tool calls for
//! real.

mod support;

use tokio_util::sync::CancellationToken;

use concierge::{
    ConciergeError, Degradation, Intent, LifecycleStatus, Role, Sentiment, SpanStatus,
};
use support::{
    pipeline, push_assessor, push_review_approval, push_review_rejection, push_router,
    push_tool_call,
};

#[tokio::test]
async fn booking_inquiry_resolves_through_availability_check() {
    let p = pipeline();
    push_router(&p, "booking", 0.85);
    push_tool_call(
        &p,
        "call_1",
        "check_availability",
        r#"{"room_type": "deluxe", "check_in": "2026-03-10", "check_out": "2026-03-12"}"#,
    );
    p.backend.push_text(
        "The Deluxe Room is available March 10-12 at $219 per night. Shall I reserve it?",
    );
    push_review_approval(&p, 8);
    push_assessor(&p, "in_progress", "positive", true);

    let report = p
        .orchestrator
        .process_turn("sess-book", "Do you have a deluxe room for March 10-12?", &[])
        .await
        .unwrap();

    assert_eq!(report.intent, Intent::Booking);
    assert_eq!(report.confidence, 0.85);
    assert_eq!(report.specialist_used, "booking_agent");
    assert!(report.final_response.contains("$219"));
    assert_eq!(report.review_score, 8);
    assert_eq!(report.lifecycle_status, LifecycleStatus::InProgress);
    assert_eq!(report.sentiment, Sentiment::Positive);
    assert!(!report.escalated);
    assert!(report.follow_up_needed);
    assert!(report.degradations.is_empty());

    // The availability lookup ran against the live store.
    let tool_spans = p.sink.spans_named("check_availability");
    assert_eq!(tool_spans.len(), 1);
    assert_eq!(tool_spans[0].status, SpanStatus::Ok);
    let second_specialist_request = &p.backend.requests()[2];
    let observation = second_specialist_request
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(observation.content.contains("Deluxe Room"));
    assert!(observation.content.contains("219"));
}

#[tokio::test]
async fn low_scoring_complaint_is_force_escalated() {
    let p = pipeline();
    push_router(&p, "complaint", 0.9);
    p.backend
        .push_text("I apologize for the noise issue during your stay.");
    // The reviewer waves it through but scores it badly.
    push_review_approval(&p, 2);
    push_assessor(&p, "in_progress", "negative", true);

    let report = p
        .orchestrator
        .process_turn("sess-complaint", "The room above mine was loud all night!", &[])
        .await
        .unwrap();

    assert_eq!(report.intent, Intent::Complaint);
    assert!(report.escalated);
    assert_eq!(report.lifecycle_status, LifecycleStatus::Escalated);
    assert_eq!(report.sentiment, Sentiment::Negative);

    // Both firing rules land in the escalation score comment.
    let scores = p.sink.scores();
    let escalated = scores.iter().find(|s| s.name == "escalated").unwrap();
    assert_eq!(escalated.value, 1.0);
    let reason = escalated.comment.as_deref().unwrap();
    assert!(reason.contains("sentiment"), "got: {reason}");
    assert!(reason.contains("complaint scored 2"), "got: {reason}");
}

#[tokio::test]
async fn billing_tool_failure_recovers_on_retry() {
    let p = pipeline();
    push_router(&p, "billing", 0.8);
    push_tool_call(&p, "call_1", "get_bill", r#"{"booking_id": "BK-9999"}"#);
    push_tool_call(&p, "call_2", "get_bill", r#"{"booking_id": "BK-1001"}"#);
    p.backend
        .push_text("I found your bill for booking BK-1001; the current total is listed below.");
    push_review_approval(&p, 7);
    push_assessor(&p, "resolved", "neutral", false);

    let report = p
        .orchestrator
        .process_turn("sess-bill", "Can you pull up my bill?", &[])
        .await
        .unwrap();

    assert!(!report.escalated);
    assert!(report.degradations.is_empty());

    // First lookup failed, second succeeded; both inside one specialist run.
    let bill_spans = p.sink.spans_named("get_bill");
    assert_eq!(bill_spans.len(), 2);
    assert_eq!(bill_spans[0].status, SpanStatus::Error);
    assert_eq!(bill_spans[1].status, SpanStatus::Ok);
    let specialist = &p.sink.spans_named("specialist_billing")[0];
    assert_eq!(specialist.attribute("iterations"), Some("3"));
    assert_eq!(specialist.attribute("tool_calls"), Some("2"));

    // The failure came back as an observation, not an aborted turn.
    let retry_request = &p.backend.requests()[2];
    let observation = retry_request
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(observation.content.contains("Tool error:"));
    assert!(observation.content.contains("BK-9999"));
}

#[tokio::test]
async fn iteration_cap_releases_best_partial_with_degradation() {
    let p = pipeline();
    push_router(&p, "general", 0.9);
    for i in 0..5 {
        if i == 2 {
            p.backend.push_response(
                concierge::CompletionResponse::new("scripted", "scripted-model")
                    .with_content("Let me gather the restaurant details for you.")
                    .with_tool_calls(vec![concierge::ToolCallRequest::new(
                        format!("call_{i}"),
                        "search_hotel_info",
                        r#"{"query": "restaurant hours"}"#,
                    )]),
            );
        } else {
            push_tool_call(
                &p,
                &format!("call_{i}"),
                "search_hotel_info",
                r#"{"query": "restaurant hours"}"#,
            );
        }
    }
    push_review_approval(&p, 6);
    push_assessor(&p, "in_progress", "neutral", true);

    let report = p
        .orchestrator
        .process_turn("sess-cap", "Tell me about every dining option.", &[])
        .await
        .unwrap();

    assert_eq!(
        report.final_response,
        "Let me gather the restaurant details for you."
    );
    assert_eq!(report.degradations, vec![Degradation::IterationCapReached]);
    assert!(!report.escalated);

    let specialist = &p.sink.spans_named("specialist_general")[0];
    assert_eq!(specialist.attribute("iterations"), Some("5"));
    assert_eq!(specialist.attribute("cap_reached"), Some("true"));
}

#[tokio::test]
async fn approved_first_pass_means_exactly_one_specialist_run() {
    let p = pipeline();
    push_router(&p, "general", 0.95);
    p.backend.push_text("Check-out is at 11am; late check-out is available on request.");
    push_review_approval(&p, 9);
    push_assessor(&p, "resolved", "positive", false);

    p.orchestrator
        .process_turn("sess-one", "When is check-out?", &[])
        .await
        .unwrap();

    // Router, one specialist call, one review, one assessment.
    assert_eq!(p.backend.requests().len(), 4);
    assert_eq!(p.sink.spans_named("specialist_general").len(), 1);
}

#[tokio::test]
async fn revision_cycle_emits_one_span_per_stage_entry() {
    let p = pipeline();
    push_router(&p, "amenities", 0.9);
    p.backend.push_text("We have a gym.");
    push_review_rejection(&p, 3, "Mention the hours and the location");
    p.backend
        .push_text("The fitness center on floor 2 is open around the clock.");
    push_review_approval(&p, 8);
    push_assessor(&p, "resolved", "neutral", false);

    let report = p
        .orchestrator
        .process_turn("sess-rev", "Is there a gym?", &[])
        .await
        .unwrap();

    assert_eq!(
        report.final_response,
        "The fitness center on floor 2 is open around the clock."
    );
    assert!(report.degradations.is_empty());

    // Span count equals the number of stage entries actually executed.
    assert_eq!(p.sink.spans_named("turn").len(), 1);
    assert_eq!(p.sink.spans_named("router").len(), 1);
    assert_eq!(p.sink.spans_named("specialist_amenities").len(), 2);
    assert_eq!(p.sink.spans_named("review").len(), 2);
    assert_eq!(p.sink.spans_named("pm_assessment").len(), 1);
    assert_eq!(p.sink.open_span_count(), 0);

    // The re-run carries the reviewer's rationale.
    let rerun = &p.backend.requests()[3];
    let last = rerun.messages.last().unwrap();
    assert!(last.content.contains("Mention the hours and the location"));
}

#[tokio::test]
async fn exhausted_review_budget_escalates_with_degradation() {
    let p = pipeline();
    push_router(&p, "amenities", 0.9);
    p.backend.push_text("Draft one.");
    push_review_rejection(&p, 4, "Be specific");
    p.backend.push_text("Draft two.");
    push_review_rejection(&p, 4, "Still too vague");
    push_assessor(&p, "in_progress", "neutral", true);

    let report = p
        .orchestrator
        .process_turn("sess-exhaust", "Spa packages?", &[])
        .await
        .unwrap();

    assert_eq!(report.final_response, "Draft two.");
    assert_eq!(report.degradations, vec![Degradation::ReviewExhausted]);
    assert!(report.escalated);

    let scores = p.sink.scores();
    let escalated = scores.iter().find(|s| s.name == "escalated").unwrap();
    let reason = escalated.comment.as_deref().unwrap();
    assert!(reason.contains("review budget exhausted"), "got: {reason}");
}

#[tokio::test]
async fn low_router_confidence_escalates_an_otherwise_clean_turn() {
    let p = pipeline();
    push_router(&p, "general", 0.4);
    p.backend.push_text("Happy to help with that.");
    push_review_approval(&p, 8);
    push_assessor(&p, "resolved", "neutral", false);

    let report = p
        .orchestrator
        .process_turn("sess-lowconf", "Hmm, about the thing from before?", &[])
        .await
        .unwrap();

    assert!(report.escalated);
    assert_eq!(report.lifecycle_status, LifecycleStatus::Escalated);
    assert_eq!(report.review_score, 8);
}

#[tokio::test]
async fn assessor_outage_degrades_to_fallback_signal() {
    let p = pipeline();
    push_router(&p, "general", 0.9);
    p.backend.push_text("The lobby bar closes at midnight.");
    push_review_approval(&p, 8);
    p.backend
        .push_error(concierge::GatewayError::Outage { status: 503 });

    let report = p
        .orchestrator
        .process_turn("sess-degrade", "How late is the bar open?", &[])
        .await
        .unwrap();

    // Lifecycle assessment never fails the turn.
    assert_eq!(report.lifecycle_status, LifecycleStatus::Resolved);
    assert_eq!(report.sentiment, Sentiment::Neutral);
    assert!(!report.follow_up_needed);
    assert!(!report.escalated);
}

#[tokio::test]
async fn review_outage_is_fatal_for_the_turn() {
    let p = pipeline();
    push_router(&p, "general", 0.9);
    p.backend.push_text("Draft text.");
    p.backend
        .push_error(concierge::GatewayError::Outage { status: 502 });

    let error = p
        .orchestrator
        .process_turn("sess-reviewfail", "Anything on tonight?", &[])
        .await
        .unwrap_err();

    match error {
        ConciergeError::Gateway { stage, .. } => {
            assert_eq!(stage, concierge::Stage::Review);
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
    assert_eq!(p.sink.open_span_count(), 0);
    let turn = &p.sink.spans_named("turn")[0];
    assert_eq!(turn.status, SpanStatus::Error);
}

#[tokio::test]
async fn cancelled_token_fails_the_turn_before_any_gateway_call() {
    let p = pipeline();
    push_router(&p, "general", 0.9);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = p
        .orchestrator
        .process_turn_cancellable("sess-cancel", "Hello?", &[], &cancel)
        .await
        .unwrap_err();

    assert!(matches!(error, ConciergeError::Cancelled));
    // The queued router reply was never consumed.
    assert_eq!(p.backend.remaining(), 1);

    let turn = &p.sink.spans_named("turn")[0];
    assert_eq!(turn.status, SpanStatus::Error);
    assert_eq!(turn.attribute("phase"), Some("failed"));
    assert_eq!(p.sink.open_span_count(), 0);
}

#[tokio::test]
async fn multi_turn_session_feeds_the_transcript_forward() {
    let p = pipeline();

    push_router(&p, "booking", 0.9);
    p.backend
        .push_text("Certainly, which dates are you considering?");
    push_review_approval(&p, 8);
    push_assessor(&p, "in_progress", "neutral", true);

    let first = p
        .orchestrator
        .process_turn("sess-multi", "I'd like to book a deluxe room.", &[])
        .await
        .unwrap();

    let transcript = vec![
        concierge::Message::user("I'd like to book a deluxe room."),
        concierge::Message::assistant(first.final_response.as_str()),
    ];

    push_router(&p, "booking", 0.9);
    p.backend
        .push_text("March 10 to 12 it is; the Deluxe Room is $219 per night.");
    push_review_approval(&p, 8);
    push_assessor(&p, "in_progress", "positive", true);

    let second = p
        .orchestrator
        .process_turn("sess-multi", "March 10 to 12.", &transcript)
        .await
        .unwrap();
    assert!(!second.escalated);

    // Turn two's router request replays the prior exchange.
    let router_request = &p.backend.requests()[4];
    assert_eq!(router_request.messages.len(), 4);
    assert!(router_request.messages[1]
        .content
        .contains("deluxe room"));

    // Correlation ids are fresh per turn.
    assert_ne!(first.correlation_id, second.correlation_id);
}

#[tokio::test]
async fn metrics_aggregate_only_completed_turns() {
    let p = pipeline();

    push_router(&p, "booking", 0.9);
    p.backend.push_text("Booked.");
    push_review_approval(&p, 8);
    push_assessor(&p, "resolved", "positive", false);

    push_router(&p, "complaint", 0.9);
    p.backend.push_text("I'm very sorry about that.");
    push_review_approval(&p, 3);
    push_assessor(&p, "in_progress", "negative", true);

    push_router(&p, "booking", 0.9);
    p.backend.push_text("Extended to the 14th.");
    push_review_approval(&p, 7);
    push_assessor(&p, "resolved", "neutral", false);

    // Router failure: this turn errors and must not be counted.
    p.backend.push_text("not a classification");

    for (session, message) in [
        ("m-1", "Book me a room."),
        ("m-2", "My shower was cold."),
        ("m-3", "Extend my stay."),
    ] {
        p.orchestrator.process_turn(session, message, &[]).await.unwrap();
    }
    p.orchestrator
        .process_turn("m-4", "???", &[])
        .await
        .unwrap_err();

    let summary = p.metrics.summary();
    assert_eq!(summary.turns_total, 3);
    assert_eq!(summary.turns_by_intent.get("booking"), Some(&2));
    assert_eq!(summary.turns_by_intent.get("complaint"), Some(&1));
    assert!((summary.escalation_rate - 1.0 / 3.0).abs() < 1e-9);
    assert!((summary.mean_review_score - 6.0).abs() < 1e-9);
    assert!(summary.p95_latency.is_some());
}
