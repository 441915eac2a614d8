//! Client-facing stream events.
//!
//! One `StreamEvent` is one NDJSON record on the `/chat` stream:
//! `{"status": ..., "message": ..., "data": ..., "timestamp": ...}`.
//! Clients render by `status`:
//! - `info`      — progress, e.g. a tool is about to run
//! - `success`   — a tool call succeeded (`data` holds the result)
//! - `error`     — a tool call or the model failed (`data` holds the kind)
//! - `warning`   — something was ignored or a limit was hit
//! - `assistant` — text written by the model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Info,
    Success,
    Error,
    Warning,
    Assistant,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub status: EventStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    pub fn new(status: EventStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Warning, message)
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(EventStatus::Assistant, message)
    }
}
