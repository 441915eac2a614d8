//! System prompt construction.
//!
//! The prompt is rebuilt for every model call and never stored in a session.

use chrono::{DateTime, Utc};
use cloudclaw_core::tool::ToolRegistry;

use crate::parser::ToolCallParser;

const PERSONA: &str = "You are CloudClaw, an AWS expert assistant with access to AWS automation tools.";

/// Render the catalog the way the model sees it.
pub fn render_catalog(registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return "(no tools available)".to_string();
    }
    registry
        .descriptors()
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let required = d.required_keys();
            let params = d.property_names();
            let mut line = format!("Tool {}: {}\nDescription: {}\n", i + 1, d.name, d.description);
            if !params.is_empty() {
                line.push_str(&format!("Parameters: {}\n", params.join(", ")));
            }
            if !required.is_empty() {
                line.push_str(&format!("Required: {}\n", required.join(", ")));
            }
            line.push_str(&format!("Input Schema: {}\n", d.input_schema));
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system prompt for one model call.
pub fn build_system_prompt(
    persona: Option<&str>,
    registry: &ToolRegistry,
    parser: &ToolCallParser,
    now: DateTime<Utc>,
) -> String {
    let start = parser.start_marker().to_ascii_uppercase();
    let end = parser.end_marker().to_ascii_uppercase();
    format!(
        "{persona}\n\n\
         Available Tools:\n{catalog}\n\
         Instructions:\n\
         1. Analyze the user's query carefully.\n\
         2. If the user wants to perform an AWS action, use the appropriate tool.\n\
         3. To call a tool, respond EXACTLY in this format:\n\
         {start}\n\
         TOOL: tool_name\n\
         INPUT: {{\"key\": \"value\"}}\n\
         {end}\n\
         4. The INPUT must be a valid JSON object matching the tool's input schema.\n\
         5. Call at most one tool per response, then wait for its result.\n\
         6. Never make up tool names or parameters; only use what is listed above.\n\
         7. If no tool is needed, answer directly in clear Markdown.\n\
         8. Always consider security best practices and cost implications.\n\n\
         Current time: {now}\n",
        persona = persona.unwrap_or(PERSONA),
        catalog = render_catalog(registry),
        now = now.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
