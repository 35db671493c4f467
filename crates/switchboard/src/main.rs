// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchboard -- an intercepting LLM proxy that routes each request to the
//! cheapest model meeting the detected task's quality requirements.
//!
//! This is the binary entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use switchboard_config::{load_config, load_config_from_path, RouterConfig};
use switchboard_core::SwitchboardError;

mod inspect;
mod serve;
mod stats;

/// Switchboard -- routes LLM requests to the cheapest model that meets
/// quality requirements.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    /// Config file path (default: XDG hierarchy + ./switchboard.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the transparent HTTP proxy
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Return mock responses with routing decisions instead of calling
        /// providers
        #[arg(long)]
        dry_run: bool,
    },
    /// Route a prompt to the best model and print the decision
    Route {
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Force the background route class
        #[arg(long)]
        background: bool,
        /// Force the interactive route class
        #[arg(long)]
        interactive: bool,
    },
    /// Classify a prompt without routing
    Classify {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// List configured models
    Models {
        /// Filter by tier name (e.g. premium, budget, speed)
        #[arg(long)]
        tier: Option<String>,
    },
    /// Show routing statistics
    Stats {
        /// Filter stats by model name
        #[arg(long)]
        model: Option<String>,
    },
    /// Record feedback for a routing event
    Feedback {
        event_id: String,
        /// Rating from 1 (poor) to 5 (excellent)
        #[arg(long)]
        rating: i64,
        /// Model the user would have preferred
        #[arg(long = "override")]
        override_model: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate the configuration
    Validate,
    /// Show the config files being considered
    Init,
}

fn resolve_config(path: &Option<PathBuf>) -> Result<RouterConfig, SwitchboardError> {
    let result = match path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    result.map_err(|e| SwitchboardError::Config(e.to_string()))
}

async fn run(cli: Cli) -> Result<(), SwitchboardError> {
    let cfg = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Serve { port, dry_run } => serve::run_serve(cfg, port, dry_run).await,
        Commands::Route {
            prompt,
            background,
            interactive,
        } => inspect::run_route(&cfg, &prompt.join(" "), background, interactive),
        Commands::Classify { prompt } => inspect::run_classify(&cfg, &prompt.join(" ")),
        Commands::Models { tier } => inspect::run_models(&cfg, tier.as_deref()),
        Commands::Stats { model } => stats::run_stats(&cfg, model.as_deref()).await,
        Commands::Feedback {
            event_id,
            rating,
            override_model,
        } => stats::run_feedback(&cfg, &event_id, rating, override_model.as_deref()).await,
        Commands::Config { command } => match command {
            ConfigCommands::Validate => {
                println!("Config is valid!");
                Ok(())
            }
            ConfigCommands::Init => {
                inspect::run_config_init(&cli.config);
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
