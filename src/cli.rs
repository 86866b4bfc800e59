//! CLI for Platecheck
//!
//! Commands:
//! - `serve`: start the HTTP server (default)
//! - `doctor`: check configuration and tool server reachability

use clap::{Parser, Subcommand};
use platecheck_llm::GeminiConfig;
use platecheck_tools::{RobotClient, RobotRunner, ToolEndpoint};
use std::time::Duration;
use tracing::info;

/// Platecheck setup verification assistant
#[derive(Parser, Debug)]
#[command(name = "platecheck")]
#[command(about = "Lab robot setup verification assistant")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Check configuration and connectivity
    Doctor,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Doctor) => doctor().await,
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}

/// Report what is configured and whether the robot answers.
async fn doctor() -> anyhow::Result<()> {
    let config = crate::server::load_config()?;

    match GeminiConfig::from_env() {
        Ok(gemini) => info!("Gemini provider configured: {:?}", gemini),
        Err(e) => println!("Gemini provider NOT configured: {}", e),
    }

    println!("camera server: {}", config.tools.camera_url);
    println!("robot server:  {}", config.tools.robot_url);

    let endpoint = ToolEndpoint::new(
        "robot",
        config.tools.robot_url.clone(),
        Duration::from_secs(5),
    )?;
    match RobotClient::new(endpoint).ping().await {
        Ok(()) => println!("robot ping: ok"),
        Err(e) => println!("robot ping: failed ({})", e),
    }

    Ok(())
}
