mod auth;
mod chat;
mod cli;
mod completion;
mod config;
mod db;
mod dreams;
mod embedding;
mod enrich;
mod error;
mod export;
mod server;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oneiro", version, about = "Dream journaling backend with AI enrichment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Export stored dreams to JSON, text, or PDF
    Export {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: cli::export::ExportFormat,
        /// Output file (stdout for json/txt when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Restrict to one owner's dreams
        #[arg(long)]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::OneiroConfig::load()?;

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::Export { format, out, email } => {
            tokio::task::spawn_blocking(move || {
                cli::export::export(&config, format, out.as_deref(), email.as_deref())
            })
            .await??;
        }
    }

    Ok(())
}
