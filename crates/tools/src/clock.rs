//! Built-in `get_current_time` tool.

use async_trait::async_trait;
use cloudclaw_core::error::ToolError;
use cloudclaw_core::tool::{Tool, ToolDescriptor, ToolInput};

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_current_time",
            "Get the current UTC date and time",
            serde_json::json!({ "type": "object", "properties": {} }),
        )
    }

    async fn invoke(&self, _input: ToolInput) -> Result<serde_json::Value, ToolError> {
        let now = chrono::Utc::now();
        Ok(serde_json::json!({
            "utc": now.to_rfc3339(),
            "readable": now.format("%A, %B %-d, %Y %H:%M:%S UTC").to_string(),
            "unix": now.timestamp(),
        }))
    }
}
