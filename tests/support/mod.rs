//! Shared wiring for the integration suite: a scripted gateway, seeded
//! front-desk and knowledge stores, and a memory trace sink behind one
//! orchestrator.
#![allow(dead_code)]

use std::sync::Arc;

use concierge::{
    CompletionBackend, CompletionResponse, Config, FrontDesk, KnowledgeStore,
    MemoryKnowledgeStore, MemoryTraceSink, MetricsRecorder, Orchestrator, ScriptedBackend,
    ToolCallRequest, ToolRegistry, TraceSink,
};

pub struct Pipeline {
    pub backend: Arc<ScriptedBackend>,
    pub sink: Arc<MemoryTraceSink>,
    pub metrics: Arc<MetricsRecorder>,
    pub orchestrator: Orchestrator,
}

pub fn pipeline() -> Pipeline {
    pipeline_with(Config::default())
}

pub fn pipeline_with(config: Config) -> Pipeline {
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
    Pipeline {
        backend,
        sink,
        metrics,
        orchestrator,
    }
}

pub fn push_router(p: &Pipeline, intent: &str, confidence: f64) {
    p.backend.push_text(format!(
        r#"{{"intent": "{intent}", "confidence": {confidence}, "reasoning": "scripted routing"}}"#
    ));
}

pub fn push_review_approval(p: &Pipeline, score: u8) {
    p.backend.push_text(format!(
        r#"{{"approved": true, "score": {score}, "issues": []}}"#
    ));
}

pub fn push_review_rejection(p: &Pipeline, score: u8, suggestion: &str) {
    p.backend.push_text(format!(
        r#"{{"approved": false, "score": {score}, "issues": ["Needs work"], "suggestions": "{suggestion}"}}"#
    ));
}

pub fn push_assessor(p: &Pipeline, status: &str, sentiment: &str, follow_up: bool) {
    p.backend.push_text(format!(
        r#"{{"query_status": "{status}", "guest_sentiment": "{sentiment}", "follow_up_needed": {follow_up}}}"#
    ));
}

/// A specialist reply that requests one tool call and carries no text.
pub fn push_tool_call(p: &Pipeline, id: &str, name: &str, arguments: &str) {
    p.backend.push_response(
        CompletionResponse::new("scripted", "scripted-model")
            .with_tool_calls(vec![ToolCallRequest::new(id, name, arguments)]),
    );
}
