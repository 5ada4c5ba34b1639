use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod generator;

#[derive(Parser)]
#[command(name = "rehearse", about = "Practice social conversations with a coaching partner")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive practice session
    Practice(commands::practice::PracticeArgs),
    /// Recommend a difficulty level from past sessions
    Advise(commands::advise::AdviseArgs),
    /// Inspect stored sessions
    Sessions(commands::sessions::SessionsArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Practice(args) => commands::practice::run(args).await,
        Commands::Advise(args) => commands::advise::run(args).await,
        Commands::Sessions(args) => commands::sessions::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}
