//! Error types for the CloudClaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all CloudClaw operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Discovery errors ---
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    // --- Parser errors ---
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the text-generation collaborator.
///
/// Any of these is fatal to the current turn only; the session stays usable.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Stable kind name surfaced to clients in event payloads.
    pub fn kind(&self) -> &'static str {
        "UpstreamGenerationError"
    }
}

/// Failures raised by a tool collaborator or while resolving a tool.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

/// Failures while discovering the tool catalog from a collaborator.
///
/// Fatal to session start (and to a catalog refresh); never a per-call failure.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Tool source unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed tool catalog: {0}")]
    MalformedCatalog(String),

    #[error("Duplicate tool name in catalog: {0}")]
    DuplicateTool(String),
}

/// Problems found while extracting a tool call from model text.
///
/// None of these abort a turn: the affected text is kept as narrative and the
/// user gets a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Tool block opened at byte {offset} is never closed")]
    UnbalancedBlock { offset: usize },

    #[error("Malformed tool block: {reason}")]
    MalformedInput { reason: String, raw: String },

    #[error("Additional tool block ignored; only one tool call is executed per response")]
    ExtraToolCall { raw: String },
}

impl ParseError {
    /// Stable kind name surfaced to clients in event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnbalancedBlock { .. } => "UnbalancedBlockError",
            Self::MalformedInput { .. } => "MalformedInputError",
            Self::ExtraToolCall { .. } => "ExtraToolCall",
        }
    }

    /// The raw text involved, if the error carries any.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::UnbalancedBlock { .. } => None,
            Self::MalformedInput { raw, .. } | Self::ExtraToolCall { raw } => Some(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "list_s3_buckets".into(),
            reason: "connection refused".into(),
        });
        assert!(err.to_string().contains("list_s3_buckets"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn parse_error_kinds() {
        assert_eq!(
            ParseError::UnbalancedBlock { offset: 3 }.kind(),
            "UnbalancedBlockError"
        );
        let malformed = ParseError::MalformedInput {
            reason: "bad json".into(),
            raw: "INPUT: {".into(),
        };
        assert_eq!(malformed.kind(), "MalformedInputError");
        assert_eq!(malformed.raw_text(), Some("INPUT: {"));
    }

    #[test]
    fn discovery_error_converts_to_top_level() {
        let err: Error = DiscoveryError::DuplicateTool("list_ec2_instances".into()).into();
        assert!(matches!(err, Error::Discovery(_)));
        assert!(err.to_string().contains("list_ec2_instances"));
    }
}
