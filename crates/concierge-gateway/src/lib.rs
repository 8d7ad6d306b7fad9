//! Completion backend abstraction for the concierge pipeline.
//!
//! Every stage that needs a model reply goes through the [`CompletionBackend`]
//! trait, so the orchestrator never knows which provider is behind it. Two
//! implementations ship here: an OpenAI-compatible HTTP backend for
//! production and a scripted backend for tests and the demo CLI mode.

pub mod extract;
pub(crate) mod http_client;
mod openai_backend;
mod scripted;
mod types;

pub use scripted::ScriptedBackend;
pub use types::{
    CompletionBackend, CompletionRequest, CompletionResponse, Message, Role, ToolCallRequest,
    ToolSpec,
};

pub(crate) use openai_backend::OpenAiBackend;

use concierge_config::GatewaySettings;
use concierge_types::GatewayError;

/// Construct a completion backend for the configured provider.
///
/// The scripted backend is not constructible from settings; callers wanting
/// canned responses build a [`ScriptedBackend`] directly and inject it.
///
/// # Errors
///
/// Returns `GatewayError::Misconfiguration` if the provider is unknown, the
/// API key environment variable is unset, or the HTTP client cannot be
/// constructed.
pub fn from_settings(settings: &GatewaySettings) -> Result<Box<dyn CompletionBackend>, GatewayError> {
    match settings.provider.as_str() {
        "openai" => {
            let backend = OpenAiBackend::new_from_settings(settings)?;
            Ok(Box::new(backend))
        }
        unknown => Err(GatewayError::Misconfiguration(format!(
            "Unknown completion provider '{unknown}'. Supported providers: openai."
        ))),
    }
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = GatewaySettings {
            provider: "carrier-pigeon".to_string(),
            ..GatewaySettings::default()
        };

        match from_settings(&settings) {
            Err(GatewayError::Misconfiguration(msg)) => {
                assert!(msg.contains("carrier-pigeon"), "got: {msg}");
                assert!(msg.contains("openai"), "got: {msg}");
            }
            Err(other) => panic!("expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("expected Misconfiguration, got a backend"),
        }
    }

    #[test]
    fn openai_without_key_env_is_a_misconfiguration() {
        let settings = GatewaySettings {
            api_key_env: "CONCIERGE_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..GatewaySettings::default()
        };

        match from_settings(&settings) {
            Err(GatewayError::Misconfiguration(msg)) => {
                assert!(msg.contains("CONCIERGE_TEST_KEY_THAT_IS_NOT_SET"), "got: {msg}");
            }
            Err(other) => panic!("expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("expected Misconfiguration, got a backend"),
        }
    }
}
