use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soilamend", version, about = "Soil-test correction recommendations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run interactive setup
    Init,
    /// Validate config and fertilizer catalog
    Check,
    /// Build correction recommendations from a lab report
    Report {
        /// Lab results file (YAML or JSON)
        results: PathBuf,

        /// Override the allowed excess percent for this run
        #[arg(long)]
        excess: Option<f64>,

        /// Emit the amendment summary as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
}
