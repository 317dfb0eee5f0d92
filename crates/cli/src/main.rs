//! Carbon Aware Scheduler CLI
//!
//! A command-line tool for ranking regions, requesting scheduling
//! decisions, and evaluating workload energy measurements.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{energy, rank, schedule};
use std::path::PathBuf;

/// Carbon Aware Scheduler CLI
#[derive(Parser)]
#[command(name = "cas")]
#[command(author, version, about = "CLI for the Carbon Aware Scheduler", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CAS_API_URL env var)
    #[arg(long, env = "CAS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank regions by expected carbon cost, best first
    Rank {
        /// Region codes to rank
        #[arg(required = true)]
        regions: Vec<String>,

        /// Urgency factor for the schedule weight component
        #[arg(long, default_value_t = 1.0)]
        schedule_weight: f64,
    },

    /// Decide when and where to run a workload
    Schedule {
        /// Candidate regions for relocation (current region is implied)
        candidates: Vec<String>,

        /// Workload duration in minutes
        #[arg(long)]
        duration: u32,

        /// Deadline as RFC3339 or a relative offset like +3h, +90m, +2d
        #[arg(long)]
        deadline: String,

        /// Region the workload would run in by default
        #[arg(long)]
        current_region: String,

        /// Whether the workload may run in any candidate region
        #[arg(long)]
        portable: bool,
    },

    /// Energy measurement commands
    #[command(subcommand)]
    Energy(EnergyCommands),
}

#[derive(Subcommand)]
pub enum EnergyCommands {
    /// Submit a measurement JSON file for regression evaluation
    Evaluate {
        /// Path to the measurement file
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Show the stored baseline for a (branch, workload) series
    Baseline {
        /// Branch name
        branch: String,

        /// Workload name
        workload: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Rank {
            regions,
            schedule_weight,
        } => {
            rank::rank_regions(&client, regions, schedule_weight, cli.format).await?;
        }
        Commands::Schedule {
            candidates,
            duration,
            deadline,
            current_region,
            portable,
        } => {
            schedule::schedule_workload(
                &client,
                candidates,
                duration,
                &deadline,
                current_region,
                portable,
                cli.format,
            )
            .await?;
        }
        Commands::Energy(energy_cmd) => match energy_cmd {
            EnergyCommands::Evaluate { file } => {
                energy::evaluate_measurement(&client, &file, cli.format).await?;
            }
            EnergyCommands::Baseline { branch, workload } => {
                energy::show_baseline(&client, &branch, &workload, cli.format).await?;
            }
        },
    }

    Ok(())
}
