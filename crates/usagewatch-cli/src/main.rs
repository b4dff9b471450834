mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use usagewatch_core::{config::default_config_path, Config};

use commands::{
    build_scheduler,
    config::{handle_config_path, handle_config_show},
    monitor::handle_monitor,
    run::{handle_run_once, handle_summary},
};

#[derive(Parser)]
#[command(name = "usagewatch")]
#[command(about = "Foreground usage monitor and collector uploader", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send the current usage summary to the collector now
    RunOnce,
    /// Show the current usage summary without sending it
    Summary,
    /// Schedule periodic uploads and keep running until Ctrl-C
    Monitor {
        /// Run one upload immediately after scheduling
        #[arg(long)]
        now: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    if let Commands::Config {
        action: ConfigAction::Path,
    } = cli.command
    {
        handle_config_path(&config_path);
        return Ok(());
    }

    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::RunOnce => handle_run_once(&*build_scheduler(&config)?).await,
        Commands::Summary => handle_summary(&*build_scheduler(&config)?).await,
        Commands::Monitor { now } => handle_monitor(build_scheduler(&config)?, &config, now).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config),
            ConfigAction::Path => {
                handle_config_path(&config_path);
                Ok(())
            }
        },
    }
}
