//! Text-generation provider implementations for CloudClaw.
//!
//! All providers implement the `cloudclaw_core::Provider` trait.
//! The router selects the correct provider based on configuration.
//!
//! The tool catalog reaches the model through the system prompt and tool
//! calls come back as plain text, so providers never use native
//! function-calling APIs.

pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};

use cloudclaw_core::error::ProviderError;
use cloudclaw_core::message::{Message, Role};
use std::time::Duration;

/// Timeout for a single generation request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Role and content of a message as sent over the wire.
///
/// Tool turns become user turns prefixed with `Tool result:`; the backends
/// only accept `tool` messages that answer a native function call.
pub(crate) fn wire_message(message: &Message) -> (&'static str, String) {
    match message.role {
        Role::User => ("user", message.content.clone()),
        Role::Assistant => ("assistant", message.content.clone()),
        Role::System => ("system", message.content.clone()),
        Role::Tool => ("user", format!("Tool result:\n{}", message.content)),
    }
}

/// Map a transport-level reqwest failure.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-200 status to a provider error.
pub(crate) fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 if body.contains("model") => ProviderError::ModelNotFound(body),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
