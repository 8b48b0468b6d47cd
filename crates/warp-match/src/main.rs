//! warp-match — run the offer matcher against offers and workloads on disk.
//!
//! # Usage
//!
//! ```text
//! warp-match match --offer offer.json --workload web.json --instances placed.json
//! warp-match print-config --config matcher.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use warpgrid_matcher::MatcherConfig;

mod commands;

/// Filter used when neither `RUST_LOG` nor the config sets one.
const DEFAULT_LOG_FILTER: &str = "info,warpgrid=debug";

#[derive(Parser)]
#[command(
    name = "warp-match",
    about = "WarpGrid offer matcher",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to matcher.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match one offer against one workload and print the outcome as JSON.
    ///
    /// Exits 0 when the offer matches and 1 when it does not.
    Match {
        /// Offer JSON file.
        #[arg(long)]
        offer: PathBuf,
        /// Workload spec JSON file.
        #[arg(long)]
        workload: PathBuf,
        /// JSON array of already-placed instances.
        #[arg(long)]
        instances: Option<PathBuf>,
        /// Accept fragments of these roles, overriding the configured selector.
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Print the effective configuration as TOML.
    PrintConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => commands::load_config(path)?,
        None => MatcherConfig::default(),
    };

    let filter = config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(filter))?,
        )
        .init();

    match cli.command {
        Commands::Match {
            offer,
            workload,
            instances,
            roles,
        } => {
            let matched = commands::matching::run(
                &config,
                &offer,
                &workload,
                instances.as_deref(),
                &roles,
            )?;
            Ok(if matched {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::PrintConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
