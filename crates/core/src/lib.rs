//! # CloudClaw Core
//!
//! Domain types, traits, and error definitions for the CloudClaw assistant.
//! This crate has **no web or HTTP dependencies**: it defines the domain model
//! that the provider, tool, agent and gateway crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping text generators and tool backends via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, Session, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{
    Tool, ToolCall, ToolDescriptor, ToolFailure, ToolFailureKind, ToolInput, ToolOutcome,
    ToolRegistry, ToolResult, ToolSource,
};
