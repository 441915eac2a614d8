//! Executes a parsed tool call against a registry snapshot.
//!
//! `invoke` never fails past its boundary: every problem becomes a typed
//! failure inside the returned [`ToolResult`].

use cloudclaw_core::error::ToolError;
use cloudclaw_core::tool::{ToolCall, ToolFailureKind, ToolRegistry, ToolResult};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn invoke(&self, call: ToolCall) -> ToolResult {
        let started = Instant::now();
        let ToolCall {
            tool_name, input, ..
        } = call;

        let descriptor = match self.registry.lookup(&tool_name) {
            Ok(d) => d,
            Err(_) => {
                warn!(tool = %tool_name, "Model requested an unknown tool");
                let known = self.registry.names().join(", ");
                return ToolResult::failure(
                    tool_name.clone(),
                    ToolFailureKind::UnknownTool,
                    format!("Unknown tool '{tool_name}'. Available tools: {known}"),
                    started.elapsed(),
                );
            }
        };

        let missing: Vec<&str> = descriptor
            .required_keys()
            .into_iter()
            .filter(|key| input.get(*key).is_none_or(|v| v.is_null()))
            .collect();
        if !missing.is_empty() {
            return ToolResult::failure(
                tool_name,
                ToolFailureKind::ArgumentValidation,
                format!("Missing required argument(s): {}", missing.join(", ")),
                started.elapsed(),
            );
        }

        let tool = match self.registry.get(&tool_name) {
            Ok(tool) => tool,
            Err(e) => {
                return ToolResult::failure(
                    tool_name,
                    ToolFailureKind::UnknownTool,
                    e.to_string(),
                    started.elapsed(),
                );
            }
        };

        debug!(tool = %tool_name, timeout_secs = self.timeout.as_secs(), "Invoking tool");
        let execution = AssertUnwindSafe(tool.invoke(input)).catch_unwind();
        let outcome = tokio::time::timeout(self.timeout, execution).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(Ok(output))) => ToolResult::success(tool_name, output, elapsed),
            Ok(Ok(Err(e))) => {
                let kind = match e {
                    ToolError::InvalidArguments(_) => ToolFailureKind::ArgumentValidation,
                    ToolError::NotFound(_) => ToolFailureKind::UnknownTool,
                    _ => ToolFailureKind::ToolExecution,
                };
                warn!(tool = %tool_name, error = %e, "Tool failed");
                ToolResult::failure(tool_name, kind, e.to_string(), elapsed)
            }
            Ok(Err(_panic)) => {
                warn!(tool = %tool_name, "Tool panicked");
                ToolResult::failure(
                    tool_name,
                    ToolFailureKind::ToolExecution,
                    "Tool crashed while executing",
                    elapsed,
                )
            }
            Err(_) => {
                let err = ToolError::Timeout {
                    tool_name: tool_name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                };
                warn!(tool = %tool_name, "Tool timed out");
                ToolResult::failure(tool_name, ToolFailureKind::ToolExecution, err.to_string(), elapsed)
            }
        }
    }
}
