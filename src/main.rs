mod cli;
mod watcher;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platewatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => watcher::run(args.config).await?,
    }

    Ok(())
}
