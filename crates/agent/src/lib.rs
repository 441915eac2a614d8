//! The tool-call orchestration core of CloudClaw.
//!
//! A user message goes through this loop:
//!
//! 1. **Append** the message to the session history
//! 2. **Prompt** the model with persona, tool catalog, call format and history
//! 3. **Parse** the reply for a `---TOOL_START---` block
//! 4. **If a tool is requested**: invoke it once, append the result, go to 2
//! 5. **Otherwise**: append the answer and finish
//!
//! Every step is streamed to the client as a [`StreamEvent`]. The loop stops
//! early when the tool bound is reached, the model fails or the client
//! disconnects.

pub mod invoker;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod session_store;
pub mod sink;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use invoker::ToolInvoker;
pub use orchestrator::{ConversationOrchestrator, StopReason, TurnSummary};
pub use parser::{ParsedResponse, ToolCallParser};
pub use session_store::{SessionHandle, SessionStore};
pub use sink::EventSink;
pub use stream_event::{EventStatus, StreamEvent};
