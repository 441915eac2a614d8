//! The conversation loop.
//!
//! One call to [`ConversationOrchestrator::run_turn`] handles one user
//! message:
//!
//! ```text
//! AwaitingModel → ModelResponded ─┬─ FinalAnswer ──────────────→ Done
//!       ↑                         └─ ToolRequested → ExecutingTool ┐
//!       └──────────────────────────────────────────────────────────┘
//! ```
//!
//! History is always appended before the matching event is emitted, so a
//! client that sees an event can rely on the session already reflecting it.

use chrono::Utc;
use cloudclaw_core::error::{ParseError, ProviderError};
use cloudclaw_core::event::{DomainEvent, EventBus};
use cloudclaw_core::message::{Message, Session};
use cloudclaw_core::provider::{Provider, ProviderRequest};
use cloudclaw_core::tool::{ToolOutcome, ToolRegistry, ToolResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::invoker::{DEFAULT_TOOL_TIMEOUT, ToolInvoker};
use crate::parser::ToolCallParser;
use crate::prompt::build_system_prompt;
use crate::sink::EventSink;
use crate::stream_event::StreamEvent;

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 5;

/// Final assistant text when the model only asked for another tool.
const LIMIT_FALLBACK: &str = "I reached the maximum number of tool calls for this request. \
     Here is what I found so far; ask me to continue if you need more.";

const EMPTY_FALLBACK: &str = "I don't have an answer for that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingModel,
    ModelResponded,
    ToolRequested,
    ExecutingTool,
    FinalAnswer,
}

impl State {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingModel => "awaiting_model",
            Self::ModelResponded => "model_responded",
            Self::ToolRequested => "tool_requested",
            Self::ExecutingTool => "executing_tool",
            Self::FinalAnswer => "final_answer",
        }
    }
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without requesting a tool.
    Final,
    /// The model asked for a tool after the per-message bound was reached.
    IterationLimit,
    /// The text generator failed.
    UpstreamFailure,
    /// The client went away; no further model calls were made.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub stop_reason: StopReason,
    pub model_calls: usize,
    pub tool_calls: usize,
}

/// Everything one conversation needs: collaborators plus limits.
///
/// Built per connection from shared pieces; holds no per-session state.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    registry: Arc<ToolRegistry>,
    parser: ToolCallParser,
    max_tool_iterations: usize,
    tool_timeout: Duration,
    persona: Option<String>,
    event_bus: Option<Arc<EventBus>>,
}

impl ConversationOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            registry,
            parser: ToolCallParser::default(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            persona: None,
            event_bus: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_parser(mut self, parser: ToolCallParser) -> Self {
        self.parser = parser;
        self
    }

    /// Set the maximum number of tool executions per user message.
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Replace the built-in persona line of the system prompt.
    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    fn request(&self, session: &Session) -> ProviderRequest {
        let system = build_system_prompt(
            self.persona.as_deref(),
            &self.registry,
            &self.parser,
            Utc::now(),
        );
        let mut messages = Vec::with_capacity(session.len() + 1);
        messages.push(Message::system(system));
        messages.extend(session.history().iter().cloned());
        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        }
    }

    /// Drive one user message to completion, streaming every step to `sink`.
    ///
    /// The caller holds the session lock for the whole call.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_message: &str,
        sink: &EventSink,
    ) -> TurnSummary {
        let session_id = session.id.to_string();
        self.publish(DomainEvent::TurnStarted {
            session_id: session_id.clone(),
            timestamp: Utc::now(),
        });
        session.push(Message::user(user_message));

        let invoker = ToolInvoker::new(self.registry.clone()).with_timeout(self.tool_timeout);
        let mut model_calls = 0;
        let mut tool_calls = 0;
        let summary = |stop_reason, model_calls, tool_calls| TurnSummary {
            stop_reason,
            model_calls,
            tool_calls,
        };

        loop {
            let mut state = State::AwaitingModel;
            if sink.is_disconnected() {
                info!(session_id = %session_id, "Client gone; stopping turn before next model call");
                return summary(StopReason::Disconnected, model_calls, tool_calls);
            }

            debug!(session_id = %session_id, iteration = model_calls, state = state.as_str(), "Calling model");
            model_calls += 1;
            let response = match self.provider.complete(self.request(session)).await {
                Ok(response) => response,
                Err(e) => {
                    self.upstream_failed(&e, sink).await;
                    return summary(StopReason::UpstreamFailure, model_calls, tool_calls);
                }
            };

            state = State::ModelResponded;
            self.publish(DomainEvent::ResponseGenerated {
                session_id: session_id.clone(),
                model: response.model.clone(),
                tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                timestamp: Utc::now(),
            });

            let text = response.message.content;
            let parsed = self.parser.parse(&text);
            debug!(
                session_id = %session_id,
                state = state.as_str(),
                has_call = parsed.call.is_some(),
                issues = parsed.issues.len(),
                "Model responded"
            );

            let Some(call) = parsed.call.clone() else {
                state = State::FinalAnswer;
                let answer = if text.trim().is_empty() {
                    EMPTY_FALLBACK.to_string()
                } else {
                    text
                };
                session.push(Message::assistant(answer.clone()));
                self.emit_issues(&parsed.issues, sink).await;
                sink.emit(StreamEvent::assistant(answer)).await;
                info!(session_id = %session_id, state = state.as_str(), model_calls, tool_calls, "Turn complete");
                return summary(StopReason::Final, model_calls, tool_calls);
            };

            if sink.is_disconnected() {
                info!(
                    session_id = %session_id,
                    tool = %call.tool_name,
                    "Client gone while the model was generating; tool not started"
                );
                session.push(Message::assistant(text));
                return summary(StopReason::Disconnected, model_calls, tool_calls);
            }

            if tool_calls >= self.max_tool_iterations {
                warn!(
                    session_id = %session_id,
                    tool = %call.tool_name,
                    limit = self.max_tool_iterations,
                    "Tool iteration limit reached"
                );
                let narrative = parsed.narrative();
                let answer = match narrative.trim() {
                    "" => LIMIT_FALLBACK.to_string(),
                    text => text.to_string(),
                };
                session.push(Message::assistant(answer.clone()));
                self.emit_issues(&parsed.issues, sink).await;
                sink.emit(
                    StreamEvent::warning(format!(
                        "Stopped after {} tool calls; '{}' was not executed.",
                        self.max_tool_iterations, call.tool_name
                    ))
                    .with_data(json!({
                        "max_tool_iterations": self.max_tool_iterations,
                        "skipped_tool": call.tool_name,
                    })),
                )
                .await;
                sink.emit(StreamEvent::assistant(answer)).await;
                return summary(StopReason::IterationLimit, model_calls, tool_calls);
            }

            state = State::ToolRequested;
            debug!(session_id = %session_id, tool = %call.tool_name, state = state.as_str(), "Tool requested");
            let before = parsed.before.trim();
            let after = parsed.after.trim();
            let narrative = [before, after]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            if !narrative.is_empty() {
                session.push(Message::assistant(narrative));
            }
            self.emit_issues(&parsed.issues, sink).await;
            if !before.is_empty() {
                sink.emit(StreamEvent::assistant(before)).await;
            }
            sink.emit(
                StreamEvent::info(format!("Executing tool: {}", call.tool_name)).with_data(json!({
                    "tool": call.tool_name,
                    "input": call.input,
                })),
            )
            .await;

            state = State::ExecutingTool;
            info!(session_id = %session_id, tool = %call.tool_name, state = state.as_str(), "Executing tool");
            let result = invoker.invoke(call).await;
            tool_calls += 1;
            session.push(Message::tool(result.to_json().to_string()));
            self.publish(DomainEvent::ToolExecuted {
                tool_name: result.tool_name.clone(),
                success: result.is_success(),
                duration_ms: result.elapsed_ms(),
                timestamp: Utc::now(),
            });
            sink.emit(result_event(&result)).await;
            if !after.is_empty() {
                sink.emit(StreamEvent::assistant(after)).await;
            }
        }
    }

    async fn emit_issues(&self, issues: &[ParseError], sink: &EventSink) {
        for issue in issues {
            let message = match issue {
                ParseError::UnbalancedBlock { .. } => {
                    "The model started a tool call but never finished it; showing its text instead."
                }
                ParseError::MalformedInput { .. } => {
                    "The model's tool call could not be understood; showing its text instead."
                }
                ParseError::ExtraToolCall { .. } => {
                    "The model asked for more than one tool; only the first one was run."
                }
            };
            let mut data = json!({ "error_kind": issue.kind(), "detail": issue.to_string() });
            if let Some(raw) = issue.raw_text() {
                data["raw"] = json!(raw);
            }
            sink.emit(StreamEvent::warning(message).with_data(data)).await;
        }
    }

    async fn upstream_failed(&self, error: &ProviderError, sink: &EventSink) {
        warn!(error = %error, "Text generation failed");
        self.publish(DomainEvent::ErrorOccurred {
            context: "generation".into(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
        sink.emit(
            StreamEvent::error("The language model could not produce a response. Please try again.")
                .with_data(json!({
                    "error_kind": error.kind(),
                    "detail": error.to_string(),
                })),
        )
        .await;
    }

    /// One-shot question: no tools, no session.
    pub async fn query(
        &self,
        query: &str,
        context: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut system = format!(
            "{}\n\nInstructions:\n\
             1. Provide accurate, helpful information about AWS.\n\
             2. Format responses in clear Markdown.\n\
             3. Be concise but thorough.\n",
            self.persona
                .as_deref()
                .unwrap_or("You are CloudClaw, an AWS expert assistant.")
        );
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            system.push_str(&format!("\nContext:\n{context}\n"));
        }
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system), Message::user(query)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };
        let response = self.provider.complete(request).await.inspect_err(|e| {
            self.publish(DomainEvent::ErrorOccurred {
                context: "query".into(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        })?;
        Ok(response.message.content)
    }
}

fn result_event(result: &ToolResult) -> StreamEvent {
    match &result.outcome {
        ToolOutcome::Success(_) => StreamEvent::success(format!(
            "Tool {} completed in {} ms",
            result.tool_name,
            result.elapsed_ms()
        )),
        ToolOutcome::Failure(failure) => StreamEvent::error(format!(
            "Tool {} failed ({})",
            result.tool_name,
            failure.kind.as_str()
        )),
    }
    .with_data(result.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_event::EventStatus;
    use crate::test_helpers::{EchoTool, SequentialMockProvider, tool_block};
    use cloudclaw_core::message::{Role, SessionId};
    use cloudclaw_core::tool::Tool;

    fn registry() -> Arc<ToolRegistry> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(EchoTool::new("list_ec2_instances")),
            Arc::new(EchoTool::new("stop_ec2_instance").requiring(&["instance_id"])),
        ];
        Arc::new(ToolRegistry::from_tools(tools).unwrap())
    }

    async fn run(
        provider: SequentialMockProvider,
        configure: impl FnOnce(ConversationOrchestrator) -> ConversationOrchestrator,
        message: &str,
    ) -> (TurnSummary, Session, Vec<StreamEvent>, Arc<SequentialMockProvider>) {
        let provider = Arc::new(provider);
        let orchestrator = configure(ConversationOrchestrator::new(
            provider.clone(),
            "mock-model",
            registry(),
        ));
        let mut session = Session::new(SessionId::from("test"));
        let (sink, mut rx) = EventSink::channel(64);
        let summary = orchestrator.run_turn(&mut session, message, &sink).await;
        drop(sink);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (summary, session, events, provider)
    }

    fn statuses(events: &[StreamEvent]) -> Vec<EventStatus> {
        events.iter().map(|e| e.status).collect()
    }

    fn roles(session: &Session) -> Vec<Role> {
        session.history().iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn plain_answer() {
        let (summary, session, events, _) = run(
            SequentialMockProvider::texts(&["Hello! How can I help with AWS?"]),
            |o| o,
            "hi",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::Final);
        assert_eq!(statuses(&events), vec![EventStatus::Assistant]);
        assert_eq!(roles(&session), vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn tool_then_answer() {
        let (summary, session, events, provider) = run(
            SequentialMockProvider::texts(&[
                tool_block("list_ec2_instances", "{}").as_str(),
                "You have 2 instances.",
            ]),
            |o| o,
            "list my instances",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::Final);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            statuses(&events),
            vec![EventStatus::Info, EventStatus::Success, EventStatus::Assistant]
        );
        assert_eq!(roles(&session), vec![Role::User, Role::Tool, Role::Assistant]);
        assert_eq!(events[0].data.as_ref().unwrap()["tool"], "list_ec2_instances");
    }

    #[tokio::test]
    async fn narrative_around_block_is_streamed_in_order() {
        let response = format!(
            "Let me look.\n{}\nThis may take a second.",
            tool_block("list_ec2_instances", "{}")
        );
        let (_, session, events, _) = run(
            SequentialMockProvider::texts(&[response.as_str(), "Done."]),
            |o| o,
            "list",
        )
        .await;
        let messages: Vec<_> = events.iter().map(|e| (e.status, e.message.as_str())).collect();
        assert_eq!(messages[0], (EventStatus::Assistant, "Let me look."));
        assert_eq!(messages[1].0, EventStatus::Info);
        assert_eq!(messages[2].0, EventStatus::Success);
        assert_eq!(messages[3], (EventStatus::Assistant, "This may take a second."));
        assert_eq!(messages[4], (EventStatus::Assistant, "Done."));
        assert_eq!(
            roles(&session),
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(
            session.history()[1].content,
            "Let me look.\n\nThis may take a second."
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back() {
        let (summary, session, events, provider) = run(
            SequentialMockProvider::texts(&[
                tool_block("nonexistent_tool", "{}").as_str(),
                "Sorry, I can't do that.",
            ]),
            |o| o,
            "do the impossible",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::Final);
        assert_eq!(provider.call_count(), 2);
        let errors: Vec<_> = events
            .iter()
            .filter(|e| e.status == EventStatus::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].data.as_ref().unwrap()["error_kind"],
            "UnknownToolError"
        );
        assert!(session.history()[1].content.contains("UnknownToolError"));
    }

    #[tokio::test]
    async fn missing_argument_is_fed_back() {
        let (_, _, events, _) = run(
            SequentialMockProvider::texts(&[
                tool_block("stop_ec2_instance", "{}").as_str(),
                "Which instance?",
            ]),
            |o| o,
            "stop it",
        )
        .await;
        assert_eq!(
            events[1].data.as_ref().unwrap()["error_kind"],
            "ArgumentValidationError"
        );
    }

    #[tokio::test]
    async fn malformed_block_becomes_warning_and_answer() {
        let text = "Checking.\n---TOOL_START---\nTOOL: list_ec2_instances\nINPUT: {\"state\": \"run\n---TOOL_END---";
        let (summary, session, events, provider) = run(
            SequentialMockProvider::texts(&[text]),
            |o| o,
            "list",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::Final);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            statuses(&events),
            vec![EventStatus::Warning, EventStatus::Assistant]
        );
        assert_eq!(
            events[0].data.as_ref().unwrap()["error_kind"],
            "MalformedInputError"
        );
        assert_eq!(events[1].message, text);
        assert_eq!(session.history()[1].content, text);
    }

    #[tokio::test]
    async fn iteration_limit() {
        let block = tool_block("list_ec2_instances", "{}");
        let (summary, session, events, provider) = run(
            SequentialMockProvider::texts(&[block.as_str(); 3]),
            |o| o.with_max_tool_iterations(2),
            "loop forever",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::IterationLimit);
        assert_eq!(summary.tool_calls, 2);
        assert_eq!(provider.call_count(), 3);
        let tail = statuses(&events[events.len() - 2..]);
        assert_eq!(tail, vec![EventStatus::Warning, EventStatus::Assistant]);
        assert_eq!(events.last().unwrap().message, LIMIT_FALLBACK);
        let last = session.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(
            session
                .history()
                .iter()
                .filter(|m| m.role == Role::Tool)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn iteration_limit_still_reports_parse_issues() {
        let first = tool_block("list_ec2_instances", "{}");
        let second = format!(
            "{}\n{}",
            tool_block("list_ec2_instances", "{}"),
            tool_block("stop_ec2_instance", r#"{"instance_id": "i-1"}"#)
        );
        let (summary, _, events, _) = run(
            SequentialMockProvider::texts(&[first.as_str(), second.as_str()]),
            |o| o.with_max_tool_iterations(1),
            "list twice",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::IterationLimit);
        let warnings: Vec<_> = events
            .iter()
            .filter(|e| e.status == EventStatus::Warning)
            .collect();
        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings[0].data.as_ref().unwrap()["error_kind"],
            "ExtraToolCall"
        );
        assert_eq!(
            warnings[1].data.as_ref().unwrap()["skipped_tool"],
            "list_ec2_instances"
        );
    }

    #[tokio::test]
    async fn upstream_failure_keeps_session_usable() {
        let (summary, session, events, _) = run(
            SequentialMockProvider::failing(),
            |o| o,
            "hello",
        )
        .await;
        assert_eq!(summary.stop_reason, StopReason::UpstreamFailure);
        assert_eq!(statuses(&events), vec![EventStatus::Error]);
        assert_eq!(
            events[0].data.as_ref().unwrap()["error_kind"],
            "UpstreamGenerationError"
        );
        assert_eq!(roles(&session), vec![Role::User]);
    }

    #[tokio::test]
    async fn disconnect_stops_after_tool() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            tool_block("list_ec2_instances", "{}").as_str(),
            "never requested",
        ]));
        let orchestrator =
            ConversationOrchestrator::new(provider.clone(), "mock-model", registry());
        let mut session = Session::new(SessionId::from("gone"));
        let (sink, rx) = EventSink::channel(8);
        drop(rx);
        let summary = orchestrator.run_turn(&mut session, "list", &sink).await;
        assert_eq!(summary.stop_reason, StopReason::Disconnected);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(roles(&session), vec![Role::User]);
    }

    /// Drops the client's receiver while "generating", then asks for a tool.
    struct HangUpProvider {
        rx: std::sync::Mutex<Option<tokio::sync::mpsc::Receiver<StreamEvent>>>,
        reply: String,
    }

    #[async_trait::async_trait]
    impl Provider for HangUpProvider {
        fn name(&self) -> &str {
            "hang_up_mock"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<cloudclaw_core::provider::ProviderResponse, ProviderError> {
            drop(self.rx.lock().unwrap().take());
            Ok(crate::test_helpers::make_text_response(&self.reply))
        }
    }

    #[tokio::test]
    async fn disconnect_during_generation_skips_tool() {
        let reply = tool_block("stop_ec2_instance", r#"{"instance_id": "i-1"}"#);
        let (sink, rx) = EventSink::channel(8);
        let provider = Arc::new(HangUpProvider {
            rx: std::sync::Mutex::new(Some(rx)),
            reply: reply.clone(),
        });
        let orchestrator = ConversationOrchestrator::new(provider, "mock-model", registry());
        let mut session = Session::new(SessionId::from("gone"));

        let summary = orchestrator.run_turn(&mut session, "stop i-1", &sink).await;

        assert_eq!(summary.stop_reason, StopReason::Disconnected);
        assert_eq!(summary.model_calls, 1);
        assert_eq!(summary.tool_calls, 0);
        assert_eq!(roles(&session), vec![Role::User, Role::Assistant]);
        assert_eq!(session.history()[1].content, reply);
    }

    #[tokio::test]
    async fn events_reach_the_bus() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let bus_for_run = bus.clone();
        run(
            SequentialMockProvider::texts(&[tool_block("list_ec2_instances", "{}").as_str(), "ok"]),
            move |o| o.with_event_bus(bus_for_run),
            "list",
        )
        .await;
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec![
                "turn_started",
                "response_generated",
                "tool_executed",
                "response_generated"
            ]
        );
    }

    #[tokio::test]
    async fn one_shot_query() {
        let provider = Arc::new(SequentialMockProvider::texts(&["S3 is object storage."]));
        let orchestrator = ConversationOrchestrator::new(provider.clone(), "mock-model", registry());
        let answer = orchestrator.query("What is S3?", None).await.unwrap();
        assert_eq!(answer, "S3 is object storage.");
        let request = provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 2);
    }
}
