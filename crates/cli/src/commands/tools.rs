//! `cloudclaw tools` — Discover and print the tool catalog.

use cloudclaw_config::AppConfig;
use cloudclaw_core::tool::ToolRegistry;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let source = cloudclaw_tools::source_from_config(&config.tools);
    let registry = ToolRegistry::discover(source.as_ref())
        .await
        .map_err(|e| format!("Tool discovery failed: {e}"))?;

    println!("🧰 CloudClaw Tools ({})", registry.len());
    println!("==================");
    for descriptor in registry.descriptors() {
        println!("  {}", descriptor.name);
        println!("      {}", descriptor.description);
        let required = descriptor.required_keys();
        if !required.is_empty() {
            println!("      required: {}", required.join(", "));
        }
    }

    Ok(())
}
