//! Configuration inspection
//!
//! Settings come from two optional TOML layers (user, then project) on top of
//! built-in defaults. These commands show which layers are in play and what
//! the practice commands will actually use.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{ConfigLoader, GeneratorConfig, GeneratorKind, RehearseConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved generator and data directory, then the merged configuration
    Show,
    /// Show configuration layers and whether each exists
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    for line in resolved_lines(&config) {
        println!("# {}", line);
    }
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn show_paths() -> Result<()> {
    let user = ConfigLoader::user_config_path();
    let project = ConfigLoader::project_config_path();
    println!("{}", layer_line("User config", user.as_deref()));
    println!("{}", layer_line("Project config", Some(&project)));

    // A broken layer should not hide where the files are
    match ConfigLoader::load() {
        Ok(config) => println!("{}", layer_line("Data dir", Some(&config.storage.data_dir))),
        Err(e) => println!("Config error:   {:#}", e),
    }
    Ok(())
}

/// One `label: path (status)` line. `None` means the platform has no such location.
fn layer_line(label: &str, path: Option<&Path>) -> String {
    let label = format!("{}:", label);
    match path {
        Some(path) => {
            let status = if path.exists() { "found" } else { "not found" };
            format!("{:<15} {} ({})", label, path.display(), status)
        }
        None => format!("{:<15} (unavailable on this platform)", label),
    }
}

fn resolved_lines(config: &RehearseConfig) -> Vec<String> {
    vec![
        format!("Generator: {}", generator_label(&config.generator)),
        format!("Data dir:  {}", config.storage.data_dir.display()),
        format!("Locking:   {:?}", config.engine.concurrency.policy),
    ]
}

fn generator_label(generator: &GeneratorConfig) -> String {
    match generator.kind {
        GeneratorKind::Offline => "offline (scripted lines)".to_string(),
        GeneratorKind::Ollama => format!("ollama ({} at {})", generator.model, generator.host),
    }
}
