//! `cloudclaw chat` — Talk to a running gateway over its NDJSON stream.

use std::io::Write;

use cloudclaw_agent::{EventStatus, StreamEvent};
use cloudclaw_gateway::ndjson::NdjsonDecoder;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:5001";

pub async fn run(
    url: Option<String>,
    session: Option<String>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = url.unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
    let base = base.trim_end_matches('/');
    let client = reqwest::Client::new();

    if let Some(msg) = message {
        return send(&client, base, session.as_deref(), &msg).await;
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        CloudClaw Chat — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Gateway:   {base}");
    println!("  Session:   {}", session.as_deref().unwrap_or("default"));
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        if let Err(e) = send(&client, base, session.as_deref(), line).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

/// Post one message and print events as they arrive.
async fn send(
    client: &reqwest::Client,
    base: &str,
    session: Option<&str>,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut body = serde_json::json!({ "message": message });
    if let Some(id) = session {
        body["session_id"] = serde_json::Value::String(id.to_string());
    }

    let response = client
        .post(format!("{base}/chat"))
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Could not reach gateway at {base}: {e}"))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(format!("Gateway returned {status}: {text}").into());
    }

    let mut decoder = NdjsonDecoder::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        for event in decoder.push(&chunk?) {
            print_event(event);
        }
    }
    if let Some(event) = decoder.finish() {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: Result<StreamEvent, serde_json::Error>) {
    match event {
        Ok(event) if event.status == EventStatus::Assistant => println!("{}", render(&event)),
        Ok(event) => eprintln!("{}", render(&event)),
        Err(e) => tracing::warn!(error = %e, "Skipping malformed stream line"),
    }
}

/// Terminal rendering of one event, chosen by its status.
pub fn render(event: &StreamEvent) -> String {
    match event.status {
        EventStatus::Info => format!("  ⏳ {}", event.message),
        EventStatus::Success => format!("  ✅ {}", event.message),
        EventStatus::Error => format!("  ❌ {}", event.message),
        EventStatus::Warning => format!("  ⚠️  {}", event.message),
        EventStatus::Assistant => event
            .message
            .lines()
            .map(|line| format!("  Assistant > {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
