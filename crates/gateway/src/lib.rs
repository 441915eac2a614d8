//! HTTP API gateway for CloudClaw.
//!
//! Exposes the streaming chat endpoint, one-shot queries, session and
//! catalog management, and an SSE feed of domain events.
//!
//! Built on Axum; chat responses are NDJSON streams fed by the
//! orchestrator through a bounded channel.

pub mod api;
pub mod ndjson;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use cloudclaw_agent::{ConversationOrchestrator, SessionStore, ToolCallParser};
use cloudclaw_config::AppConfig;
use cloudclaw_core::error::DiscoveryError;
use cloudclaw_core::event::{DomainEvent, EventBus};
use cloudclaw_core::provider::Provider;
use cloudclaw_core::tool::{ToolRegistry, ToolSource};

/// Request bodies above this size are rejected before reaching a handler.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub sessions: SessionStore,
    pub event_bus: Arc<EventBus>,
    pub start_time: DateTime<Utc>,
    source: Box<dyn ToolSource>,
    registry: RwLock<Arc<ToolRegistry>>,
    parser: ToolCallParser,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Assemble state around an already discovered catalog.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        source: Box<dyn ToolSource>,
        registry: ToolRegistry,
        event_bus: Arc<EventBus>,
    ) -> cloudclaw_core::Result<Self> {
        let parser = ToolCallParser::new(
            config.agent.tool_start_marker.as_str(),
            config.agent.tool_end_marker.as_str(),
        )?;
        let sessions = SessionStore::new(config.gateway.max_sessions);
        Ok(Self {
            config,
            provider,
            sessions,
            event_bus,
            start_time: Utc::now(),
            source,
            registry: RwLock::new(Arc::new(registry)),
            parser,
        })
    }

    /// Current catalog snapshot. Turns keep the snapshot they started with.
    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-query the tool source and swap the catalog.
    ///
    /// On failure the previous catalog stays in place.
    pub async fn refresh_tools(&self) -> Result<Arc<ToolRegistry>, DiscoveryError> {
        let registry = match ToolRegistry::discover(self.source.as_ref()).await {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "tool_refresh".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };
        *self.registry.write().unwrap_or_else(|e| e.into_inner()) = registry.clone();
        self.event_bus.publish(DomainEvent::CatalogDiscovered {
            tool_count: registry.len(),
            timestamp: Utc::now(),
        });
        info!(tools = registry.len(), "Tool catalog refreshed");
        Ok(registry)
    }

    /// Per-request orchestrator bound to the current catalog snapshot.
    pub fn orchestrator(&self) -> ConversationOrchestrator {
        let agent = &self.config.agent;
        ConversationOrchestrator::new(self.provider.clone(), self.config.model(), self.registry())
            .with_temperature(self.config.default_temperature)
            .with_max_tokens(self.config.default_max_tokens)
            .with_parser(self.parser.clone())
            .with_max_tool_iterations(agent.max_tool_iterations)
            .with_tool_timeout(Duration::from_secs(agent.tool_timeout_secs))
            .with_persona(agent.system_prompt_override.clone())
            .with_event_bus(self.event_bus.clone())
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - permissive CORS (browser clients on any origin)
/// - request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    api::router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// The tool catalog is discovered before binding; a discovery failure
/// aborts startup.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let router = cloudclaw_providers::build_from_config(&config);
    let provider = router.default().ok_or_else(|| {
        format!(
            "provider '{}' is not configured",
            config.default_provider
        )
    })?;

    let source = cloudclaw_tools::source_from_config(&config.tools);
    let registry = ToolRegistry::discover(source.as_ref())
        .await
        .inspect_err(|e| error!(error = %e, "Tool discovery failed; refusing to start"))?;

    let event_bus = Arc::new(EventBus::default());
    event_bus.publish(DomainEvent::CatalogDiscovered {
        tool_count: registry.len(),
        timestamp: Utc::now(),
    });

    info!(
        provider = provider.name(),
        model = config.model(),
        tools = registry.len(),
        "Gateway state ready"
    );

    let state = Arc::new(GatewayState::new(
        config, provider, source, registry, event_bus,
    )?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
