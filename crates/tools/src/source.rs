//! Tool sources: where a registry's catalog comes from.

use async_trait::async_trait;
use cloudclaw_config::ToolsConfig;
use cloudclaw_core::error::DiscoveryError;
use cloudclaw_core::tool::{Tool, ToolSource};
use std::sync::Arc;
use std::time::Duration;

use crate::aws_api::aws_catalog;
use crate::clock::CurrentTimeTool;
use crate::remote::RemoteCatalogSource;

/// A fixed, in-process set of tools.
pub struct StaticSource {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            name: name.into(),
            tools,
        }
    }
}

#[async_trait]
impl ToolSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
        Ok(self.tools.clone())
    }
}

/// Concatenates the catalogs of several sources.
///
/// Any failing source fails the whole discovery; duplicate names across
/// sources are rejected when the registry is built.
pub struct CompositeSource {
    sources: Vec<Box<dyn ToolSource>>,
}

impl CompositeSource {
    pub fn new(sources: Vec<Box<dyn ToolSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ToolSource for CompositeSource {
    fn name(&self) -> &str {
        "composite"
    }

    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>, DiscoveryError> {
        let mut all = Vec::new();
        for source in &self.sources {
            let tools = source.discover().await?;
            tracing::debug!(source = source.name(), tools = tools.len(), "Source discovered");
            all.extend(tools);
        }
        Ok(all)
    }
}

/// Build the configured tool source.
pub fn source_from_config(config: &ToolsConfig) -> Box<dyn ToolSource> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        });

    let mut local: Vec<Arc<dyn Tool>> = Vec::new();
    if let Some(url) = &config.aws_api_url {
        local.extend(aws_catalog(url, client.clone()));
    }
    if config.enable_builtin {
        local.push(Arc::new(CurrentTimeTool));
    }

    let mut sources: Vec<Box<dyn ToolSource>> = vec![Box::new(StaticSource::new("builtin", local))];
    if let Some(url) = &config.catalog_url {
        sources.push(Box::new(RemoteCatalogSource::new(url, client)));
    }

    if sources.len() == 1 {
        sources.remove(0)
    } else {
        Box::new(CompositeSource::new(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudclaw_core::tool::ToolRegistry;

    #[tokio::test]
    async fn default_config_yields_aws_and_clock() {
        let source = source_from_config(&ToolsConfig::default());
        let registry = ToolRegistry::discover(source.as_ref()).await.unwrap();
        assert_eq!(registry.len(), 13);
        assert!(registry.lookup("list_ec2_instances").is_ok());
        assert!(registry.lookup("get_current_time").is_ok());
    }

    #[tokio::test]
    async fn builtin_only() {
        let config = ToolsConfig {
            aws_api_url: None,
            catalog_url: None,
            request_timeout_secs: 5,
            enable_builtin: true,
        };
        let registry = ToolRegistry::discover(source_from_config(&config).as_ref())
            .await
            .unwrap();
        assert_eq!(registry.names(), vec!["get_current_time"]);
    }

    #[tokio::test]
    async fn composite_duplicates_fail_registry() {
        let source = CompositeSource::new(vec![
            Box::new(StaticSource::new("a", vec![Arc::new(CurrentTimeTool)])),
            Box::new(StaticSource::new("b", vec![Arc::new(CurrentTimeTool)])),
        ]);
        assert!(matches!(
            ToolRegistry::discover(&source).await.err().unwrap(),
            DiscoveryError::DuplicateTool(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_catalog_fails_composite() {
        let config = ToolsConfig {
            aws_api_url: None,
            catalog_url: Some("http://127.0.0.1:9".into()),
            request_timeout_secs: 2,
            enable_builtin: true,
        };
        let source = source_from_config(&config);
        assert!(matches!(
            source.discover().await.err().unwrap(),
            DiscoveryError::Unreachable(_)
        ));
    }
}
