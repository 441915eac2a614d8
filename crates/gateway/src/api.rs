//! HTTP API routes.
//!
//! Endpoints:
//!
//! - `GET    /health`          — Liveness plus provider, model and catalog size
//! - `POST   /chat`            — Send a message, get an NDJSON event stream
//! - `POST   /query`           — One-shot question, no tools, no session
//! - `GET    /sessions/{id}`   — Session history
//! - `DELETE /sessions/{id}`   — Clear a session
//! - `GET    /tools`           — Current tool catalog
//! - `POST   /tools/refresh`   — Re-discover the catalog
//! - `GET    /help`            — Example queries and tool list
//! - `GET    /api/docs`        — Endpoint reference
//! - `GET    /events`          — SSE stream of domain events

use axum::{
    Router,
    body::Body,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};
use tracing::{debug, info, warn};

use cloudclaw_agent::EventSink;
use cloudclaw_core::message::{Message, SessionId};
use cloudclaw_core::tool::{ToolDescriptor, ToolRegistry};

use crate::SharedState;
use crate::ndjson;

/// Session used when a chat request names none.
pub const DEFAULT_SESSION_ID: &str = "default";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/query", post(query_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/tools", get(list_tools_handler))
        .route("/tools/refresh", post(refresh_tools_handler))
        .route("/help", get(help_handler))
        .route("/api/docs", get(docs_handler))
        .route("/events", get(events_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Extra lines of context appended to the system prompt.
    #[serde(default)]
    pub context: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub tools: usize,
    pub sessions: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: String,
    pub last_activity_at: String,
    pub message_count: usize,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClearedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescriptor>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpCategory {
    pub category: String,
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpResponse {
    pub success: bool,
    pub examples: Vec<HelpCategory>,
    pub available_tools: Vec<String>,
    pub tips: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointDoc {
    pub endpoint: String,
    pub method: String,
    pub description: String,
    pub parameters: BTreeMap<String, String>,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocsResponse {
    pub success: bool,
    pub api_version: String,
    pub endpoints: Vec<EndpointDoc>,
    pub streaming_format: String,
}

/// Error body. `messages` maps a request field to what is wrong with it and
/// is only present for validation failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, Vec<String>>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            messages: BTreeMap::new(),
        }),
    )
}

fn validation_error(messages: BTreeMap<String, Vec<String>>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Validation error".into(),
            messages,
        }),
    )
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected request body");
        validation_error(BTreeMap::from([(
            "body".to_string(),
            vec![rejection.body_text()],
        )]))
    })
}

/// Check a free-text field against the configured length bound.
fn check_text(
    field: &str,
    value: &str,
    max_chars: usize,
    errors: &mut BTreeMap<String, Vec<String>>,
) {
    let len = value.chars().count();
    if value.trim().is_empty() || len > max_chars {
        errors
            .entry(field.to_string())
            .or_default()
            .push(format!("Length must be between 1 and {max_chars}."));
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        provider: state.provider.name().into(),
        model: state.config.model().into(),
        tools: state.registry().len(),
        sessions: state.sessions.len(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

/// `POST /chat` — run one turn and stream its events as NDJSON.
///
/// The turn runs in its own task holding the session lock, so a second
/// message for the same session waits for this one to finish. If the client
/// goes away the task notices on its next emit and winds down.
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = parse_body(payload)?;

    let mut errors = BTreeMap::new();
    check_text(
        "message",
        &payload.message,
        state.config.gateway.max_message_chars,
        &mut errors,
    );
    if payload
        .session_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        errors
            .entry("session_id".to_string())
            .or_default()
            .push("Must not be blank.".to_string());
    }
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let session_id = SessionId(
        payload
            .session_id
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
    );
    info!(session_id = %session_id, message_len = payload.message.len(), "Chat request");

    let handle = state.sessions.get(&session_id);
    let orchestrator = state.orchestrator();
    let (sink, rx) = EventSink::channel(state.config.gateway.stream_buffer);
    let message = payload.message;

    tokio::spawn(async move {
        let mut session = handle.lock().await;
        let summary = orchestrator.run_turn(&mut session, &message, &sink).await;
        debug!(
            session_id = %session_id,
            stop_reason = ?summary.stop_reason,
            model_calls = summary.model_calls,
            tool_calls = summary.tool_calls,
            "Chat turn finished"
        );
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(ndjson::encode_event(&event)));

    Ok((
        [
            (header::CONTENT_TYPE, ndjson::CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

async fn query_handler(
    State(state): State<SharedState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let payload = parse_body(payload)?;

    let mut errors = BTreeMap::new();
    check_text(
        "query",
        &payload.query,
        state.config.gateway.max_message_chars,
        &mut errors,
    );
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let context = payload.context.join("\n");
    let response = state
        .orchestrator()
        .query(&payload.query, Some(context.as_str()))
        .await
        .map_err(|e| {
            warn!(error = %e, "Query failed");
            api_error(StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    Ok(Json(QueryResponse {
        success: true,
        response,
    }))
}

/// `GET /sessions/{id}` — waits for a running turn on that session to finish.
async fn get_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let handle = state
        .sessions
        .find(&SessionId(id))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Session not found"))?;
    let session = handle.lock().await;

    Ok(Json(SessionResponse {
        session_id: session.id.to_string(),
        created_at: session.created_at.to_rfc3339(),
        last_activity_at: session.last_activity_at.to_rfc3339(),
        message_count: session.len(),
        messages: session.history().to_vec(),
    }))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionClearedResponse>, ApiError> {
    if !state.sessions.remove(&SessionId(id.clone())).await {
        return Err(api_error(StatusCode::NOT_FOUND, "Session not found"));
    }
    info!(session_id = %id, "Session cleared");
    Ok(Json(SessionClearedResponse {
        success: true,
        message: format!("Session {id} cleared"),
    }))
}

fn tool_list(registry: &ToolRegistry) -> ToolListResponse {
    let tools = registry.descriptors();
    ToolListResponse {
        count: tools.len(),
        tools,
    }
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    Json(tool_list(&state.registry()))
}

async fn refresh_tools_handler(
    State(state): State<SharedState>,
) -> Result<Json<ToolListResponse>, ApiError> {
    let registry = state.refresh_tools().await.map_err(|e| {
        warn!(error = %e, "Tool refresh failed; keeping previous catalog");
        api_error(StatusCode::BAD_GATEWAY, format!("Tool discovery failed: {e}"))
    })?;
    Ok(Json(tool_list(&registry)))
}

const HELP_EXAMPLES: &[(&str, &[&str])] = &[
    (
        "EC2 Management",
        &[
            "Create a t2.micro EC2 instance with Ubuntu",
            "Show me all running EC2 instances",
            "Stop instance i-1234567890abcdef0",
            "Start instance i-1234567890abcdef0",
            "Terminate instance i-1234567890abcdef0",
        ],
    ),
    (
        "S3 Management",
        &[
            "List all S3 buckets with their sizes",
            "Create an S3 bucket named my-data-bucket",
        ],
    ),
    (
        "Cost Analysis",
        &[
            "What's my AWS cost for the last 3 months?",
            "Show me daily costs for the past week",
        ],
    ),
    (
        "AWS Best Practices",
        &[
            "How can I optimize my AWS costs?",
            "What are AWS security best practices?",
        ],
    ),
    (
        "Operations",
        &[
            "Show me my operation history",
            "Check AWS service status",
            "Show terraform state for my resources",
        ],
    ),
];

const HELP_TIPS: &[&str] = &[
    "Ask questions about AWS services and best practices",
    "Use natural language; actions are mapped to tools automatically",
    "Reuse a session_id to keep conversation context between messages",
];

async fn help_handler(State(state): State<SharedState>) -> Json<HelpResponse> {
    let available_tools = state
        .registry()
        .descriptors()
        .iter()
        .map(|d| {
            let params = d.property_names();
            if params.is_empty() {
                format!("- {}: {}", d.name, d.description)
            } else {
                format!(
                    "- {}: {} (Parameters: {})",
                    d.name,
                    d.description,
                    params.join(", ")
                )
            }
        })
        .collect();

    Json(HelpResponse {
        success: true,
        examples: HELP_EXAMPLES
            .iter()
            .map(|(category, queries)| HelpCategory {
                category: category.to_string(),
                queries: queries.iter().map(|q| q.to_string()).collect(),
            })
            .collect(),
        available_tools,
        tips: HELP_TIPS.iter().map(|t| t.to_string()).collect(),
    })
}

/// (endpoint, method, description, parameters, response)
type EndpointRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str)],
    &'static str,
);

const ENDPOINTS: &[EndpointRow] = &[
    (
        "/chat",
        "POST",
        "Chat with tool use, streamed as NDJSON events",
        &[
            ("message", "Your message (required)"),
            ("session_id", "Conversation to continue (optional, default \"default\")"),
        ],
        "One JSON object per line: status, message, optional data, timestamp",
    ),
    (
        "/query",
        "POST",
        "Answer a single question without tools or session",
        &[
            ("query", "Your question (required)"),
            ("context", "Extra context lines (optional)"),
        ],
        "JSON with success and response",
    ),
    (
        "/sessions/{id}",
        "GET",
        "Conversation history of a session",
        &[],
        "JSON with timestamps and messages",
    ),
    (
        "/sessions/{id}",
        "DELETE",
        "Clear a conversation session",
        &[],
        "Success message",
    ),
    ("/tools", "GET", "Current tool catalog", &[], "JSON with tools and count"),
    (
        "/tools/refresh",
        "POST",
        "Re-discover the tool catalog",
        &[],
        "JSON with tools and count",
    ),
    ("/help", "GET", "Example queries and tips", &[], "JSON with examples and tips"),
    ("/api/docs", "GET", "This endpoint reference", &[], "JSON with endpoints"),
    (
        "/events",
        "GET",
        "Domain events as server-sent events",
        &[],
        "text/event-stream",
    ),
    (
        "/health",
        "GET",
        "Health check",
        &[],
        "JSON with status, provider, model and catalog size",
    ),
];

async fn docs_handler() -> Json<DocsResponse> {
    Json(DocsResponse {
        success: true,
        api_version: env!("CARGO_PKG_VERSION").into(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(endpoint, method, description, params, response)| EndpointDoc {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                description: description.to_string(),
                parameters: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                response: response.to_string(),
            })
            .collect(),
        streaming_format: ndjson::CONTENT_TYPE.into(),
    })
}

/// `GET /events` — SSE stream of domain events (turns, tool runs, errors).
async fn events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.event_bus.subscribe())
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event.event_type()).data(data))
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use async_trait::async_trait;
    use axum::http::Request;
    use cloudclaw_agent::{EventStatus, StreamEvent};
    use cloudclaw_config::AppConfig;
    use cloudclaw_core::error::{DiscoveryError, ProviderError, ToolError};
    use cloudclaw_core::event::EventBus;
    use cloudclaw_core::message::Role;
    use cloudclaw_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use cloudclaw_core::tool::{Tool, ToolInput, ToolSource};
    use http_body_util::BodyExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Replies from a script, then "Done." forever.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let text = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "Done.".to_string());
            Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    struct ListInstances;

    #[async_trait]
    impl Tool for ListInstances {
        fn describe(&self) -> ToolDescriptor {
            ToolDescriptor::new(
                "list_ec2_instances",
                "List EC2 instances with optional filters",
                serde_json::json!({
                    "type": "object",
                    "properties": { "state_filter": { "type": "string" } }
                }),
            )
        }

        async fn invoke(&self, _input: ToolInput) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!([
                { "instance_id": "i-0aaa", "state": "running" },
                { "instance_id": "i-0bbb", "state": "stopped" }
            ]))
        }
    }

    /// Serves the catalog until `fail_from` discoveries have happened.
    struct TestSource {
        calls: AtomicUsize,
        fail_from: usize,
    }

    #[async_trait]
    impl ToolSource for TestSource {
        fn name(&self) -> &str {
            "test"
        }

        async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fail_from {
                return Err(DiscoveryError::Unreachable("connection refused".into()));
            }
            Ok(vec![Arc::new(ListInstances)])
        }
    }

    async fn test_state(replies: &[&str]) -> SharedState {
        let source = TestSource {
            calls: AtomicUsize::new(0),
            fail_from: 1,
        };
        let registry = ToolRegistry::discover(&source).await.unwrap();
        Arc::new(GatewayState::new(
            AppConfig::default(),
            Arc::new(ScriptedProvider::new(replies)),
            Box::new(source),
            registry,
            Arc::new(EventBus::default()),
        )
        .unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> bytes::Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn stream_events(body: &[u8]) -> Vec<StreamEvent> {
        let mut decoder = ndjson::NdjsonDecoder::new();
        let events: Vec<StreamEvent> =
            decoder.push(body).into_iter().map(Result::unwrap).collect();
        assert!(decoder.finish().is_none());
        events
    }

    #[tokio::test]
    async fn health_reports_provider_and_catalog() {
        let app = build_router(test_state(&[]).await);
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.provider, "gateway_mock");
        assert_eq!(health.model, "granite3.1");
        assert_eq!(health.tools, 1);
    }

    #[tokio::test]
    async fn chat_streams_tool_run_as_ndjson() {
        let state = test_state(&[
            "---TOOL_START---\nTOOL: list_ec2_instances\nINPUT: {}\n---TOOL_END---",
            "You have 2 instances.",
        ])
        .await;
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"message": "list my instances"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            ndjson::CONTENT_TYPE
        );

        let events = stream_events(&body_bytes(response).await);
        let statuses: Vec<EventStatus> = events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![EventStatus::Info, EventStatus::Success, EventStatus::Assistant]
        );
        assert_eq!(events[2].message, "You have 2 instances.");

        let response = app.oneshot(get("/sessions/default")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session: SessionResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
        assert_eq!(session.message_count, 3);
    }

    #[tokio::test]
    async fn chat_uses_named_session() {
        let state = test_state(&["Hello there."]).await;
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"message": "hi", "session_id": "alice"}),
            ))
            .await
            .unwrap();
        body_bytes(response).await;

        assert!(state.sessions.find(&SessionId::from("alice")).is_some());
        assert!(state.sessions.find(&SessionId::from(DEFAULT_SESSION_ID)).is_none());
    }

    #[tokio::test]
    async fn chat_rejects_empty_and_oversized_messages() {
        let app = build_router(test_state(&[]).await);

        for message in [String::new(), "x".repeat(1001)] {
            let response = app
                .clone()
                .oneshot(post_json("/chat", serde_json::json!({ "message": message })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let error: ErrorResponse =
                serde_json::from_slice(&body_bytes(response).await).unwrap();
            assert_eq!(error.error, "Validation error");
            assert!(error.messages.contains_key("message"));
        }
    }

    #[tokio::test]
    async fn chat_rejects_missing_field() {
        let app = build_router(test_state(&[]).await);
        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"session_id": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(error.messages.contains_key("body"));
    }

    #[tokio::test]
    async fn query_answers_without_session() {
        let state = test_state(&["EC2 is a compute service."]).await;
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/query",
                serde_json::json!({"query": "What is EC2?", "context": ["user is new to AWS"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: QueryResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body.success);
        assert_eq!(body.response, "EC2 is a compute service.");
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = build_router(test_state(&[]).await);

        let response = app.clone().oneshot(get("/sessions/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/sessions/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_clears_session() {
        let state = test_state(&[]).await;
        state
            .sessions
            .append(&SessionId::from("s1"), Message::user("hello"))
            .await;
        let app = build_router(state.clone());

        let delete = Request::builder()
            .method("DELETE")
            .uri("/sessions/s1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn lists_tools() {
        let app = build_router(test_state(&[]).await);
        let response = app.oneshot(get("/tools")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: ToolListResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body.count, 1);
        assert_eq!(body.tools[0].name, "list_ec2_instances");
    }

    #[tokio::test]
    async fn failed_refresh_is_502_and_keeps_catalog() {
        let state = test_state(&[]).await;
        let app = build_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tools/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(state.registry().len(), 1);
    }

    #[tokio::test]
    async fn help_lists_examples_and_tools() {
        let app = build_router(test_state(&[]).await);
        let response = app.oneshot(get("/help")).await.unwrap();
        let help: HelpResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(help.success);
        assert!(!help.examples.is_empty());
        assert_eq!(
            help.available_tools,
            vec![
                "- list_ec2_instances: List EC2 instances with optional filters (Parameters: state_filter)"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn docs_cover_chat_endpoint() {
        let app = build_router(test_state(&[]).await);
        let response = app.oneshot(get("/api/docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let docs: DocsResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(docs.streaming_format, "application/x-ndjson");
        let chat = docs
            .endpoints
            .iter()
            .find(|e| e.endpoint == "/chat")
            .unwrap();
        assert_eq!(chat.method, "POST");
        assert!(chat.parameters.contains_key("message"));
        assert!(chat.parameters.contains_key("session_id"));
    }

    #[tokio::test]
    async fn events_endpoint_is_sse() {
        let app = build_router(test_state(&[]).await);
        let response = app.oneshot(get("/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
    }
}
