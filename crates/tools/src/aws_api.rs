//! AWS automation API tools.
//!
//! Each tool maps to one endpoint of the AWS automation HTTP service
//! (`AWS_API_BASE_URL`, default `http://localhost:5000`). Path placeholders
//! such as `{instance_id}` are filled from the input; the remaining keys go
//! to the query string for GET/DELETE and to a JSON body for POST.

use async_trait::async_trait;
use cloudclaw_core::error::ToolError;
use cloudclaw_core::tool::{Tool, ToolDescriptor, ToolInput};
use reqwest::{Method, Url};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Where a tool lives on the AWS API.
#[derive(Debug, Clone)]
pub struct AwsRoute {
    pub method: Method,
    /// Path template, e.g. `/ec2/instances/{instance_id}/stop`
    pub path: &'static str,
}

impl AwsRoute {
    fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }

    /// Resolve the route against `base`, filling placeholders from the input.
    ///
    /// Returns the full URL and the input keys no placeholder used. Each
    /// placeholder value becomes exactly one percent-encoded path segment.
    pub fn render(&self, base: &Url, input: &ToolInput) -> Result<(Url, ToolInput), ToolError> {
        let mut rest = input.clone();
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ToolError::InvalidArguments(format!("'{base}' cannot be used as a base URL"))
            })?;
            segments.pop_if_empty();

            for part in self.path.split('/').filter(|p| !p.is_empty()) {
                let Some(key) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
                    segments.push(part);
                    continue;
                };
                let value = rest.remove(key).ok_or_else(|| {
                    ToolError::InvalidArguments(format!("Missing '{key}' argument"))
                })?;
                let segment = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                if matches!(segment.as_str(), "" | "." | "..") || segment.contains('/') {
                    return Err(ToolError::InvalidArguments(format!(
                        "'{key}' is not a valid path segment"
                    )));
                }
                segments.push(&segment);
            }
        }
        Ok((url, rest))
    }
}

/// A tool backed by one AWS API endpoint.
pub struct AwsApiTool {
    descriptor: ToolDescriptor,
    route: AwsRoute,
    base_url: String,
    client: reqwest::Client,
}

impl AwsApiTool {
    pub fn new(
        descriptor: ToolDescriptor,
        route: AwsRoute,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            descriptor,
            route,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.descriptor.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Render an input value as a query parameter.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Decode a response body.
///
/// NDJSON bodies become an array of records (lines that are not JSON are kept
/// as strings); JSON bodies are returned as-is; anything else is text.
pub fn decode_body(content_type: &str, body: &str) -> Value {
    if content_type.starts_with("application/x-ndjson") {
        let records = body
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
            })
            .collect();
        return Value::Array(records);
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[async_trait]
impl Tool for AwsApiTool {
    fn describe(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, input: ToolInput) -> Result<Value, ToolError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| self.failed(format!("Invalid AWS API URL '{}': {e}", self.base_url)))?;
        let (url, rest) = self.route.render(&base, &input)?;
        debug!(tool = %self.descriptor.name, method = %self.route.method, %url, "Calling AWS API");

        let mut request = self.client.request(self.route.method.clone(), url);
        if self.route.method == Method::POST || self.route.method == Method::PUT {
            request = request.json(&Value::Object(rest));
        } else if !rest.is_empty() {
            let params: Vec<(String, String)> = rest
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), query_value(v)))
                .collect();
            request = request.query(&params);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                self.failed("AWS API request timed out")
            } else {
                self.failed(format!("AWS API unreachable: {e}"))
            }
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| self.failed(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = match decode_body(&content_type, &body) {
                Value::Object(obj) => obj
                    .get("error")
                    .or_else(|| obj.get("message"))
                    .map(query_value)
                    .unwrap_or_else(|| body.clone()),
                _ => body.clone(),
            };
            return Err(self.failed(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        Ok(decode_body(&content_type, &body))
    }
}

fn tool(
    name: &str,
    description: &str,
    properties: Value,
    required: &[&str],
    route: AwsRoute,
) -> (ToolDescriptor, AwsRoute) {
    let descriptor = ToolDescriptor::new(
        name,
        description,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    );
    (descriptor, route)
}

/// Descriptors and routes of every AWS API tool.
pub fn aws_routes() -> Vec<(ToolDescriptor, AwsRoute)> {
    vec![
        tool(
            "create_ec2_instance",
            "Create an EC2 instance",
            json!({
                "instance_type": { "type": "string", "description": "Instance type, default t2.micro" },
                "ami_id": { "type": "string" },
                "key_name": { "type": "string" },
                "security_group_ids": { "type": "array", "items": { "type": "string" } },
                "subnet_id": { "type": "string" },
                "name": { "type": "string", "description": "Value of the Name tag" },
                "use_terraform": { "type": "boolean" }
            }),
            &[],
            AwsRoute::new(Method::POST, "/ec2/instances"),
        ),
        tool(
            "list_ec2_instances",
            "List EC2 instances with optional filters",
            json!({
                "state_filter": { "type": "string", "description": "e.g. running, stopped" },
                "tag_filters": { "type": "object", "additionalProperties": { "type": "string" } }
            }),
            &[],
            AwsRoute::new(Method::GET, "/ec2/instances"),
        ),
        tool(
            "stop_ec2_instance",
            "Stop a running EC2 instance",
            json!({ "instance_id": { "type": "string" } }),
            &["instance_id"],
            AwsRoute::new(Method::POST, "/ec2/instances/{instance_id}/stop"),
        ),
        tool(
            "start_ec2_instance",
            "Start a stopped EC2 instance",
            json!({ "instance_id": { "type": "string" } }),
            &["instance_id"],
            AwsRoute::new(Method::POST, "/ec2/instances/{instance_id}/start"),
        ),
        tool(
            "terminate_ec2_instance",
            "Terminate an EC2 instance permanently",
            json!({
                "instance_id": { "type": "string" },
                "use_terraform": { "type": "boolean" }
            }),
            &["instance_id"],
            AwsRoute::new(Method::DELETE, "/ec2/instances/{instance_id}/terminate"),
        ),
        tool(
            "list_s3_buckets",
            "List all S3 buckets",
            json!({
                "include_size": { "type": "boolean" },
                "include_object_count": { "type": "boolean" }
            }),
            &[],
            AwsRoute::new(Method::GET, "/s3/buckets"),
        ),
        tool(
            "create_s3_bucket",
            "Create a new S3 bucket",
            json!({
                "bucket_name": { "type": "string" },
                "region": { "type": "string" },
                "versioning": { "type": "boolean" },
                "encryption": { "type": "boolean" },
                "public_access_block": { "type": "boolean" }
            }),
            &["bucket_name"],
            AwsRoute::new(Method::POST, "/s3/buckets"),
        ),
        tool(
            "get_cost_analysis",
            "Get AWS cost analysis for a period",
            json!({
                "start_date": { "type": "string", "description": "YYYY-MM-DD" },
                "end_date": { "type": "string", "description": "YYYY-MM-DD" },
                "granularity": { "type": "string", "enum": ["DAILY", "MONTHLY"] },
                "service_filter": { "type": "string" },
                "generate_graph": { "type": "boolean" }
            }),
            &["start_date", "end_date"],
            AwsRoute::new(Method::POST, "/cost-analysis"),
        ),
        tool(
            "execute_aws_command",
            "Execute any AWS API command",
            json!({
                "service": { "type": "string", "description": "e.g. ec2, s3, iam" },
                "action": { "type": "string", "description": "API action, e.g. describe_vpcs" },
                "parameters": { "type": "object" }
            }),
            &["service", "action"],
            AwsRoute::new(Method::POST, "/aws/command"),
        ),
        tool(
            "get_operation_history",
            "Get history of operations",
            json!({
                "operation_type": { "type": "string" },
                "status": { "type": "string" },
                "limit": { "type": "integer" }
            }),
            &[],
            AwsRoute::new(Method::GET, "/operations/history"),
        ),
        tool(
            "describe_terraform_state",
            "Get Terraform state information",
            json!({ "resource_name": { "type": "string" } }),
            &[],
            AwsRoute::new(Method::GET, "/terraform/state"),
        ),
        tool(
            "get_aws_service_status",
            "Check AWS service health status",
            json!({ "services": { "type": "array", "items": { "type": "string" } } }),
            &[],
            AwsRoute::new(Method::GET, "/service-status"),
        ),
    ]
}

/// Build every AWS API tool against `base_url`.
pub fn aws_catalog(base_url: &str, client: reqwest::Client) -> Vec<Arc<dyn Tool>> {
    aws_routes()
        .into_iter()
        .map(|(descriptor, route)| {
            Arc::new(AwsApiTool::new(descriptor, route, base_url, client.clone())) as Arc<dyn Tool>
        })
        .collect()
}
