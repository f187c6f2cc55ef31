//! Power Theft Detection CLI
//!
//! A command-line tool for checking the scoring service, inspecting the
//! loaded model and scoring records from JSON files.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{scoring, service};
use std::path::PathBuf;

/// Power Theft Detection CLI
#[derive(Parser)]
#[command(name = "ptd")]
#[command(author, version, about = "CLI for the Power Theft Detection scoring service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PTD_API_URL env var)
    #[arg(long, env = "PTD_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health and the loaded bundle version
    Health,

    /// Show model metadata and training metrics
    Info,

    /// List features ranked by importance
    Features {
        /// Show only the N most important features
        #[arg(long)]
        top: Option<usize>,
    },

    /// Score one record from a JSON file
    Predict {
        /// File holding one record object
        #[arg(long, short = 'i')]
        file: PathBuf,

        /// Model to use (primary, fallback, random_forest, logistic_regression)
        #[arg(long, short)]
        model: Option<String>,

        /// Probability cutoff in (0, 1)
        #[arg(long, short)]
        threshold: Option<f64>,
    },

    /// Score a JSON file of records
    Batch {
        /// File holding an array of records, or an object with a `records` array
        #[arg(long, short = 'i')]
        file: PathBuf,

        /// Model to use (primary, fallback, random_forest, logistic_regression)
        #[arg(long, short)]
        model: Option<String>,

        /// Probability cutoff in (0, 1)
        #[arg(long, short)]
        threshold: Option<f64>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = config.api_url(cli.api_url);
    let format = config.format(cli.format)?;
    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => service::show_health(&client, format).await?,
        Commands::Info => service::show_model_info(&client, format).await?,
        Commands::Features { top } => service::show_features(&client, top, format).await?,
        Commands::Predict {
            file,
            model,
            threshold,
        } => {
            let model = config.model(model);
            scoring::predict(&client, &file, model.as_deref(), threshold, format).await?;
        }
        Commands::Batch {
            file,
            model,
            threshold,
        } => {
            let model = config.model(model);
            scoring::batch(&client, &file, model.as_deref(), threshold, format).await?;
        }
    }

    Ok(())
}
