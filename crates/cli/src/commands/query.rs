//! `cloudclaw query` — One-shot question answered locally, no tools.

use std::sync::Arc;

use cloudclaw_agent::ConversationOrchestrator;
use cloudclaw_config::AppConfig;
use cloudclaw_core::tool::ToolRegistry;

pub async fn run(text: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let router = cloudclaw_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let orchestrator =
        ConversationOrchestrator::new(provider, config.model(), Arc::new(ToolRegistry::empty()))
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_persona(config.agent.system_prompt_override.clone());

    eprint!("  Thinking...");
    let result = orchestrator.query(&text, None).await;
    eprint!("\r              \r");

    println!("{}", result?);
    Ok(())
}
