//! Extracts a tool call from free model text.
//!
//! The grammar is a delimited block:
//!
//! ```text
//! ---TOOL_START---
//! TOOL: list_ec2_instances
//! INPUT: {"state_filter": "running"}
//! ---TOOL_END---
//! ```
//!
//! Markers and keywords are matched ASCII case-insensitively and surrounding
//! whitespace is ignored. The INPUT value runs to the end marker, so JSON may
//! span several lines. Only the first well-formed block is honored; every
//! other block stays in the narrative.

use cloudclaw_core::error::{Error, ParseError};
use cloudclaw_core::tool::{ToolCall, ToolInput};

pub const DEFAULT_START_MARKER: &str = "---TOOL_START---";
pub const DEFAULT_END_MARKER: &str = "---TOOL_END---";

/// A model response split around the honored tool block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Text before the honored block (the whole text when there is no call)
    pub before: String,
    pub call: Option<ToolCall>,
    /// Text after the honored block
    pub after: String,
    /// Problems found in blocks that were not honored
    pub issues: Vec<ParseError>,
}

impl ParsedResponse {
    /// The input text with the honored block removed.
    pub fn narrative(&self) -> String {
        format!("{}{}", self.before, self.after)
    }
}

#[derive(Debug, Clone)]
pub struct ToolCallParser {
    start: String,
    end: String,
}

impl Default for ToolCallParser {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_ascii_lowercase(),
            end: DEFAULT_END_MARKER.to_ascii_lowercase(),
        }
    }
}

impl ToolCallParser {
    /// Parser for custom markers. Both must be non-blank.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self, Error> {
        let start = start.into().trim().to_ascii_lowercase();
        let end = end.into().trim().to_ascii_lowercase();
        if start.is_empty() || end.is_empty() {
            return Err(Error::Config {
                message: "tool block markers must not be blank".into(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start_marker(&self) -> &str {
        &self.start
    }

    pub fn end_marker(&self) -> &str {
        &self.end
    }

    pub fn parse(&self, text: &str) -> ParsedResponse {
        // ASCII lowercasing keeps byte offsets identical to `text`.
        let folded = text.to_ascii_lowercase();
        let mut issues = Vec::new();
        let mut honored: Option<(ToolCall, usize, usize)> = None;
        let mut pos = 0;

        while let Some(rel) = folded[pos..].find(&self.start) {
            let open = pos + rel;
            let body_start = open + self.start.len();
            let close = folded[body_start..].find(&self.end).map(|i| body_start + i);
            let reopen = folded[body_start..]
                .find(&self.start)
                .map(|i| body_start + i);

            let close = match (close, reopen) {
                (None, _) => {
                    issues.push(ParseError::UnbalancedBlock { offset: open });
                    break;
                }
                (Some(c), Some(r)) if r < c => {
                    issues.push(ParseError::UnbalancedBlock { offset: open });
                    pos = r;
                    continue;
                }
                (Some(c), _) => c,
            };

            let block_end = close + self.end.len();
            let raw = &text[open..block_end];
            match parse_block(&text[body_start..close]) {
                Ok((tool_name, input)) if honored.is_none() => {
                    let call = ToolCall {
                        tool_name,
                        input,
                        raw_text: raw.to_string(),
                    };
                    honored = Some((call, open, block_end));
                }
                Ok(_) => issues.push(ParseError::ExtraToolCall {
                    raw: raw.to_string(),
                }),
                Err(reason) => issues.push(ParseError::MalformedInput {
                    reason,
                    raw: raw.to_string(),
                }),
            }
            pos = block_end;
        }

        match honored {
            Some((call, open, block_end)) => ParsedResponse {
                before: text[..open].to_string(),
                call: Some(call),
                after: text[block_end..].to_string(),
                issues,
            },
            None => ParsedResponse {
                before: text.to_string(),
                call: None,
                after: String::new(),
                issues,
            },
        }
    }
}

/// Strip a case-insensitive `keyword:` prefix.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    line[keyword.len()..].trim_start().strip_prefix(':')
}

fn parse_block(body: &str) -> Result<(String, ToolInput), String> {
    let mut rest = body;

    let name_line = next_nonblank_line(&mut rest).ok_or("empty tool block")?;
    let name = strip_keyword(name_line, "tool")
        .ok_or("expected a 'TOOL:' line")?
        .trim();
    if name.is_empty() {
        return Err("tool name is empty".into());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("tool name '{name}' contains whitespace"));
    }

    let input_line = next_nonblank_line(&mut rest).ok_or("expected an 'INPUT:' line")?;
    let first = strip_keyword(input_line, "input").ok_or("expected an 'INPUT:' line")?;
    let json = format!("{first}\n{rest}");
    let json = json.trim();
    if json.is_empty() {
        return Err("INPUT is empty".into());
    }

    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(serde_json::Value::Object(map)) => Ok((name.to_string(), map)),
        Ok(other) => Err(format!("INPUT must be a JSON object, got {}", type_name(&other))),
        Err(e) => Err(format!("INPUT is not valid JSON: {e}")),
    }
}

/// Pop lines off `rest` until a non-blank one is found.
fn next_nonblank_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    loop {
        if rest.is_empty() {
            return None;
        }
        let (line, tail) = match rest.find('\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (*rest, ""),
        };
        *rest = tail;
        if !line.trim().is_empty() {
            return Some(line);
        }
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> ToolCallParser {
        ToolCallParser::default()
    }

    #[test]
    fn plain_text_has_no_call() {
        let parsed = parser().parse("You have no running instances.");
        assert!(parsed.call.is_none());
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.narrative(), "You have no running instances.");
    }

    #[test]
    fn block_in_the_middle() {
        let text = "Let me check.\n---TOOL_START---\nTOOL: list_ec2_instances\nINPUT: {}\n---TOOL_END---\nOne moment.";
        let parsed = parser().parse(text);
        let call = parsed.call.as_ref().unwrap();
        assert_eq!(call.tool_name, "list_ec2_instances");
        assert!(call.input.is_empty());
        assert_eq!(parsed.before, "Let me check.\n");
        assert_eq!(parsed.after, "\nOne moment.");
        assert_eq!(
            call.raw_text,
            "---TOOL_START---\nTOOL: list_ec2_instances\nINPUT: {}\n---TOOL_END---"
        );
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn narrative_is_text_minus_block() {
        let text = "a ---TOOL_START--- TOOL: x\nINPUT: {\"k\": 1} ---TOOL_END--- b";
        let parsed = parser().parse(text);
        let call = parsed.call.unwrap();
        assert_eq!(parsed.before.clone() + &call.raw_text + &parsed.after, text);
    }

    #[test]
    fn keywords_are_case_and_space_insensitive() {
        let text = "  ---tool_start---  \n\n   tool :  stop_ec2_instance \n  Input:{\"instance_id\":\"i-1\"}\n ---Tool_End---";
        let parsed = parser().parse(text);
        let call = parsed.call.unwrap();
        assert_eq!(call.tool_name, "stop_ec2_instance");
        assert_eq!(call.input["instance_id"], "i-1");
    }

    #[test]
    fn multiline_input() {
        let text = "---TOOL_START---\nTOOL: create_s3_bucket\nINPUT: {\n  \"bucket_name\": \"logs\",\n  \"versioning\": true\n}\n---TOOL_END---";
        let call = parser().parse(text).call.unwrap();
        assert_eq!(
            serde_json::Value::Object(call.input),
            json!({ "bucket_name": "logs", "versioning": true })
        );
    }

    #[test]
    fn unterminated_block_is_narrative() {
        let text = "Checking\n---TOOL_START---\nTOOL: list_s3_buckets\nINPUT: {}";
        let parsed = parser().parse(text);
        assert!(parsed.call.is_none());
        assert_eq!(parsed.narrative(), text);
        assert_eq!(parsed.issues, vec![ParseError::UnbalancedBlock { offset: 9 }]);
    }

    #[test]
    fn second_start_before_end_unbalances_the_first() {
        let text = "---TOOL_START---\nTOOL: a\n---TOOL_START---\nTOOL: b\nINPUT: {}\n---TOOL_END---";
        let parsed = parser().parse(text);
        assert_eq!(parsed.call.as_ref().unwrap().tool_name, "b");
        assert_eq!(parsed.issues, vec![ParseError::UnbalancedBlock { offset: 0 }]);
        assert_eq!(parsed.before, "---TOOL_START---\nTOOL: a\n");
    }

    #[test]
    fn truncated_input_is_malformed() {
        let text = "---TOOL_START---\nTOOL: list_ec2_instances\nINPUT: {\"state_filter\": \"runn\n---TOOL_END---";
        let parsed = parser().parse(text);
        assert!(parsed.call.is_none());
        assert_eq!(parsed.narrative(), text);
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].kind(), "MalformedInputError");
        assert_eq!(parsed.issues[0].raw_text(), Some(text));
    }

    #[test]
    fn missing_input_line_is_malformed() {
        let parsed = parser().parse("---TOOL_START---\nTOOL: list_ec2_instances\n---TOOL_END---");
        assert!(parsed.call.is_none());
        assert!(matches!(parsed.issues[0], ParseError::MalformedInput { .. }));
    }

    #[test]
    fn input_before_tool_is_malformed() {
        let parsed = parser().parse("---TOOL_START---\nINPUT: {}\nTOOL: x\n---TOOL_END---");
        assert!(parsed.call.is_none());
        assert_eq!(parsed.issues.len(), 1);
    }

    #[test]
    fn non_object_input_is_malformed() {
        let parsed = parser().parse("---TOOL_START---\nTOOL: x\nINPUT: [1, 2]\n---TOOL_END---");
        match &parsed.issues[0] {
            ParseError::MalformedInput { reason, .. } => assert!(reason.contains("an array")),
            other => panic!("unexpected issue: {other:?}"),
        }
    }

    #[test]
    fn first_well_formed_block_wins() {
        let text = "---TOOL_START---\nTOOL: broken\nINPUT: {\n---TOOL_END---\n\
                    ---TOOL_START---\nTOOL: first\nINPUT: {}\n---TOOL_END---\n\
                    ---TOOL_START---\nTOOL: second\nINPUT: {}\n---TOOL_END---";
        let parsed = parser().parse(text);
        assert_eq!(parsed.call.as_ref().unwrap().tool_name, "first");
        let kinds: Vec<_> = parsed.issues.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["MalformedInputError", "ExtraToolCall"]);
        assert!(parsed.before.contains("TOOL: broken"));
        assert!(parsed.after.contains("TOOL: second"));
    }

    #[test]
    fn custom_markers() {
        let parser = ToolCallParser::new("<<call>>", "<</call>>").unwrap();
        let parsed = parser.parse("<<call>>\nTOOL: get_current_time\nINPUT: {}\n<</call>>");
        assert_eq!(parsed.call.unwrap().tool_name, "get_current_time");
    }

    #[test]
    fn blank_markers_are_rejected() {
        assert!(ToolCallParser::new("", "x").is_err());
        assert!(ToolCallParser::new("<<call>>", "   ").is_err());
    }

    #[test]
    fn multibyte_text_keeps_offsets() {
        let text = "Vérification…\n---TOOL_START---\nTOOL: list_s3_buckets\nINPUT: {}\n---TOOL_END---\nTerminé ✅";
        let parsed = parser().parse(text);
        assert!(parsed.call.is_some());
        assert_eq!(parsed.before, "Vérification…\n");
        assert_eq!(parsed.after, "\nTerminé ✅");
    }
}
