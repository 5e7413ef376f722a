use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "platewatch")]
#[command(about = "Plate-recording queue monitor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the update pump against the order-management backend
    Watch(WatchArgs),
}

#[derive(clap::Args, Debug)]
pub struct WatchArgs {
    /// Path to the configuration file (overrides PLATEWATCH_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
