//! Scripted backend for tests and the demo CLI mode.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use concierge_types::GatewayError;

use crate::types::{CompletionBackend, CompletionRequest, CompletionResponse};

/// Backend that replays a queue of canned outcomes.
///
/// Each `complete` call records the incoming request and pops the next
/// queued outcome. An exhausted script yields a transport error, so a test
/// that under-provisions its script fails loudly instead of hanging.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<CompletionResponse, GatewayError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: CompletionResponse) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(response));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: GatewayError) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(error));
    }

    /// Queue a plain-text reply, the common case in scripts.
    pub fn push_text(&self, content: impl Into<String>) {
        self.push_response(
            CompletionResponse::new("scripted", "scripted-model").with_content(content),
        );
    }

    /// Requests seen so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .expect("script mutex poisoned")
            .clone()
    }

    /// Outcomes still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script mutex poisoned").len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        self.requests
            .lock()
            .expect("script mutex poisoned")
            .push(request);

        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::Transport(
                    "scripted backend has no queued response".to_string(),
                ))
            })
    }
}
