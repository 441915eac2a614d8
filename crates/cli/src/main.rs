//! CloudClaw CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP gateway
//! - `chat`   — Chat with a running gateway (streamed)
//! - `query`  — One-shot question, answered locally
//! - `tools`  — Discover and list the tool catalog

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cloudclaw",
    about = "CloudClaw — tool-calling AWS assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with a running gateway
    Chat {
        /// Gateway base URL
        #[arg(long, env = "CLOUDCLAW_URL")]
        url: Option<String>,

        /// Session id to continue
        #[arg(short, long)]
        session: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Ask a one-shot question without tools
    Query {
        /// The question
        text: String,
    },

    /// Discover and list available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            url,
            session,
            message,
        } => commands::chat::run(url, session, message).await?,
        Commands::Query { text } => commands::query::run(text).await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
