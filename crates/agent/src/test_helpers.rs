//! Scripted collaborators for orchestrator tests.

use async_trait::async_trait;
use cloudclaw_core::error::{ProviderError, ToolError};
use cloudclaw_core::message::Message;
use cloudclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use cloudclaw_core::tool::{Tool, ToolDescriptor, ToolInput};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Text responses, returned in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// A provider whose only response is a network failure.
    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::Network("connection refused".into()))])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        *self.last_request.lock().unwrap() = Some(request);
        response
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A well-formed tool block.
pub fn tool_block(name: &str, input_json: &str) -> String {
    format!("---TOOL_START---\nTOOL: {name}\nINPUT: {input_json}\n---TOOL_END---")
}

/// Echoes its input back as `{"tool": name, "input": ...}`.
pub struct EchoTool {
    name: String,
    required: Vec<String>,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            required: vec![],
        }
    }

    pub fn requiring(mut self, keys: &[&str]) -> Self {
        self.required = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            self.name.clone(),
            format!("Echo tool {}", self.name),
            serde_json::json!({
                "type": "object",
                "properties": {},
                "required": self.required,
            }),
        )
    }

    async fn invoke(&self, input: ToolInput) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({ "tool": self.name, "input": input }))
    }
}
