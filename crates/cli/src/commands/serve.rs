//! `cloudclaw serve` — Start the HTTP API server.

use cloudclaw_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("☁️  CloudClaw Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.model());
    match &config.tools.aws_api_url {
        Some(url) => println!("   AWS API:   {url}"),
        None => println!("   AWS API:   disabled"),
    }
    if let Some(url) = &config.tools.catalog_url {
        println!("   Catalog:   {url}");
    }

    cloudclaw_gateway::start(config).await?;

    Ok(())
}
