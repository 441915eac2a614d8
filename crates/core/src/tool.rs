//! Tool trait — the abstraction over callable capabilities.
//!
//! Tools are what let the assistant act: list EC2 instances, create buckets,
//! query costs. Each tool is an opaque collaborator with a name, a declared
//! input shape and a call/result contract. Tools are discovered from a
//! [`ToolSource`] once per connection and held in an immutable
//! [`ToolRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DiscoveryError, ToolError};

/// The input object of a tool call.
pub type ToolInput = serde_json::Map<String, serde_json::Value>;

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: String,

    /// Description shown to the model
    pub description: String,

    /// JSON Schema of the accepted input object
    #[serde(rename = "inputSchema", alias = "input_schema")]
    pub input_schema: serde_json::Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Keys listed under the schema's `required` array.
    pub fn required_keys(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Property names declared in the schema, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.input_schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| props.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Check the descriptor is usable in a catalog.
    fn validate(&self) -> Result<(), DiscoveryError> {
        if self.name.trim().is_empty() {
            return Err(DiscoveryError::MalformedCatalog(
                "tool with an empty name".into(),
            ));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(DiscoveryError::MalformedCatalog(format!(
                "tool name '{}' contains whitespace",
                self.name
            )));
        }
        let Some(schema) = self.input_schema.as_object() else {
            return Err(DiscoveryError::MalformedCatalog(format!(
                "input schema of '{}' is not an object",
                self.name
            )));
        };
        if let Some(required) = schema.get("required") {
            let well_formed = required
                .as_array()
                .is_some_and(|arr| arr.iter().all(|k| k.is_string()));
            if !well_formed {
                return Err(DiscoveryError::MalformedCatalog(format!(
                    "'required' of '{}' must be an array of strings",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A request to execute a tool, extracted from model text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments object
    pub input: ToolInput,

    /// The exact substring of the model response that produced this call
    pub raw_text: String,
}

/// Why a tool call did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolFailureKind {
    /// The name is not in the registry; no collaborator was called.
    UnknownTool,
    /// Required input keys are missing; no collaborator was called.
    ArgumentValidation,
    /// The collaborator failed, timed out, or panicked.
    ToolExecution,
}

impl ToolFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTool => "UnknownToolError",
            Self::ArgumentValidation => "ArgumentValidationError",
            Self::ToolExecution => "ToolExecutionError",
        }
    }
}

impl std::fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub message: String,
}

/// Success payload or failure descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(serde_json::Value),
    Failure(ToolFailure),
}

/// The result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_name: String,
    pub outcome: ToolOutcome,
    pub elapsed: Duration,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: serde_json::Value, elapsed: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success(output),
            elapsed,
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        kind: ToolFailureKind,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Failure(ToolFailure {
                kind,
                message: message.into(),
            }),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    pub fn failure_kind(&self) -> Option<ToolFailureKind> {
        match &self.outcome {
            ToolOutcome::Failure(f) => Some(f.kind),
            ToolOutcome::Success(_) => None,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// JSON view of the result, used both for the tool turn and event payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match &self.outcome {
            ToolOutcome::Success(output) => serde_json::json!({
                "tool": self.tool_name,
                "status": "success",
                "output": output,
                "elapsed_ms": self.elapsed_ms(),
            }),
            ToolOutcome::Failure(failure) => serde_json::json!({
                "tool": self.tool_name,
                "status": "error",
                "error_kind": failure.kind.as_str(),
                "error": failure.message,
                "elapsed_ms": self.elapsed_ms(),
            }),
        }
    }
}

/// The capability interface every tool collaborator implements.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name, description and input schema of this tool.
    fn describe(&self) -> ToolDescriptor;

    /// Execute the tool with the given input object.
    async fn invoke(&self, input: ToolInput) -> Result<serde_json::Value, ToolError>;
}

/// A collaborator that can list the tools it provides.
///
/// Must be re-queryable: every call returns the current catalog.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// A human-readable name for log lines.
    fn name(&self) -> &str;

    /// Fetch the current set of tools.
    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// An immutable catalog of discovered tools.
///
/// Built once per discovery and never mutated afterwards. Re-discovery builds
/// a whole new registry; holders swap their `Arc<ToolRegistry>` so readers of
/// the old snapshot never observe a partial catalog.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// A registry with no tools.
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a registry from a set of tools, validating every descriptor.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, DiscoveryError> {
        let mut registry = Self::empty();
        for tool in tools {
            let descriptor = tool.describe();
            descriptor.validate()?;
            if registry.index.contains_key(&descriptor.name) {
                return Err(DiscoveryError::DuplicateTool(descriptor.name));
            }
            registry
                .index
                .insert(descriptor.name.clone(), registry.tools.len());
            registry.tools.push(RegisteredTool { descriptor, tool });
        }
        Ok(registry)
    }

    /// Query a source and build a registry from its catalog.
    pub async fn discover(source: &dyn ToolSource) -> Result<Self, DiscoveryError> {
        let tools = source.discover().await?;
        let registry = Self::from_tools(tools)?;
        tracing::info!(
            source = source.name(),
            tools = registry.len(),
            "Tool catalog discovered"
        );
        Ok(registry)
    }

    /// Look up a tool's descriptor by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i].descriptor)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Look up the tool itself.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&i| self.tools[i].tool.clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All descriptors, in discovery order (sent to the model).
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
