//! Clickmark CLI
//!
//! Command-line interface for clickmark - bookmarks with click counts.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clickmark_core::{Config, SortKey};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "clickmark")]
#[command(about = "Clickmark - bookmarks that remember how often you use them")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use an in-memory directory with demo data instead of the API
    #[arg(long, global = true)]
    memory: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved entries (newest first unless sorted)
    #[command(alias = "ls")]
    List {
        /// Sort by alpha, clicks or last-visit
        #[arg(short, long)]
        sort: Option<SortKey>,
        /// Use the opposite direction for --sort
        #[arg(short, long, requires = "sort")]
        reverse: bool,
        /// Random order
        #[arg(long, conflicts_with = "sort")]
        shuffle: bool,
    },
    /// Save a URL
    Add {
        /// URL to save (https:// is added if no scheme is given)
        url: String,
    },
    /// Delete an entry
    #[command(alias = "delete")]
    Rm {
        /// Position in `list`, or the URL
        target: String,
    },
    /// Change an entry's URL, keeping its click history
    Rename {
        /// Position in `list`, or the current URL
        target: String,
        /// New URL
        new_url: String,
    },
    /// Open an entry in the browser and count the click
    Open {
        /// Position in `list`, or the URL
        target: String,
        /// Count the click without launching a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Interactive shell (default when no command is given)
    Shell {
        /// Count clicks without launching a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, request_timeout_secs, principal, token, log_file, log_level)
        key: String,
        /// Configuration value ("none" clears it)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need a connection
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let conn = commands::connect(&config, cli.memory).await?;

    match cli.command {
        None => commands::shell::run(&conn, false, &output).await,
        Some(Commands::Shell { no_browser }) => commands::shell::run(&conn, no_browser, &output).await,
        Some(Commands::List {
            sort,
            reverse,
            shuffle,
        }) => commands::entry::list(&conn, sort, reverse, shuffle, &output).await,
        Some(Commands::Add { url }) => commands::entry::add(&conn, url, &output).await,
        Some(Commands::Rm { target }) => commands::entry::remove(&conn, target, &output).await,
        Some(Commands::Rename { target, new_url }) => {
            commands::entry::rename(&conn, target, new_url, &output).await
        }
        Some(Commands::Open { target, no_browser }) => {
            commands::entry::open(&conn, target, no_browser, &output).await
        }
        Some(Commands::Config { .. }) => Ok(()), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// RUST_LOG wins over the configured level. Logs go to config.log_file
/// when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "clickmark_core={0},clickmark={0}",
            config.log_level
        ))
    });

    let Some(log_path) = &config.log_file else {
        // Ignore error if already initialized
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match File::create(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
