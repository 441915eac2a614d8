//! Tools discovered from a remote tool server.
//!
//! Catalog: `GET {base}/tools` answers `[{name, description, inputSchema}]`
//! (or `{"tools": [...]}`). Invocation: `POST {base}/tools/{name}/invoke`
//! with the input object, answering `{success, output, error?}`.

use async_trait::async_trait;
use cloudclaw_core::error::{DiscoveryError, ToolError};
use cloudclaw_core::tool::{Tool, ToolDescriptor, ToolInput, ToolSource};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    List(Vec<ToolDescriptor>),
    Wrapped { tools: Vec<ToolDescriptor> },
}

#[derive(Deserialize)]
struct InvokeResponse {
    success: bool,
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// A [`ToolSource`] backed by a remote tool server.
pub struct RemoteCatalogSource {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteCatalogSource {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl ToolSource for RemoteCatalogSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
        let url = format!("{}/tools", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Unreachable(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Unreachable(format!(
                "{url} answered HTTP {}",
                response.status().as_u16()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DiscoveryError::Unreachable(e.to_string()))?;
        let body: CatalogBody = serde_json::from_str(&text)
            .map_err(|e| DiscoveryError::MalformedCatalog(e.to_string()))?;
        let descriptors = match body {
            CatalogBody::List(list) | CatalogBody::Wrapped { tools: list } => list,
        };

        debug!(url = %url, tools = descriptors.len(), "Remote catalog fetched");

        Ok(descriptors
            .into_iter()
            .map(|descriptor| {
                Arc::new(RemoteTool {
                    descriptor,
                    base_url: self.base_url.clone(),
                    client: self.client.clone(),
                }) as Arc<dyn Tool>
            })
            .collect())
    }
}

/// One tool hosted by a remote tool server.
pub struct RemoteTool {
    descriptor: ToolDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl RemoteTool {
    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.descriptor.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn describe(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, input: ToolInput) -> Result<serde_json::Value, ToolError> {
        let url = format!("{}/tools/{}/invoke", self.base_url, self.descriptor.name);
        let response = self
            .client
            .post(&url)
            .json(&input)
            .send()
            .await
            .map_err(|e| self.failed(format!("tool server unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(tool = %self.descriptor.name, status = status.as_u16(), "Tool server error");
            return Err(self.failed(format!("HTTP {}: {body}", status.as_u16())));
        }

        let body: InvokeResponse = response
            .json()
            .await
            .map_err(|e| self.failed(format!("malformed tool response: {e}")))?;

        if body.success {
            Ok(body.output)
        } else {
            Err(self.failed(
                body.error
                    .unwrap_or_else(|| "tool reported failure".to_string()),
            ))
        }
    }
}
