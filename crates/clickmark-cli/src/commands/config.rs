//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use clickmark_core::Config;

use crate::output::{Output, OutputFormat};

const KEYS: &str = "api_url, request_timeout_secs, principal, token, log_file, log_level";

/// Show current configuration
///
/// The token itself is never printed.
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": config.api_url,
                    "request_timeout_secs": config.request_timeout_secs,
                    "principal": config.principal,
                    "token_set": config.token.is_some(),
                    "log_file": config.log_file,
                    "log_level": config.log_level
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.api_url.as_deref().unwrap_or(""));
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!(
                "  api_url:              {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  principal:            {}",
                config.principal.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  token:                {}",
                if config.token.is_some() { "(set)" } else { "(not set)" }
            );
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  log_level:            {}", config.log_level);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "token" { "(hidden)" } else { value.as_str() };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Update one key; "" or "none" clears optional values
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "api_url" => config.api_url = optional(value),
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "principal" => config.principal = optional(value),
        "token" => config.token = optional(value),
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        "log_level" => {
            if value.is_empty() {
                bail!("log_level cannot be empty");
            }
            config.log_level = value.to_string();
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}
