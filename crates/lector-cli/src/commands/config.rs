//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use lector_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &str = "data_dir, log_file, fetch_timeout_secs, extractor.min_site_text_len, \
                    extractor.char_threshold, extractor.title_max_chars";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "log_file": config.log_file,
                    "fetch_timeout_secs": config.fetch_timeout_secs,
                    "extractor": config.extractor,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:           {}", config.data_dir.display());
            println!(
                "  log_file:           {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  fetch_timeout_secs: {}", config.fetch_timeout_secs);
            println!();
            println!("Extractor:");
            println!(
                "  min_site_text_len:  {}",
                config.extractor.min_site_text_len
            );
            println!("  char_threshold:     {}", config.extractor.char_threshold);
            println!("  title_max_chars:    {}", config.extractor.title_max_chars);
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

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "fetch_timeout_secs" => {
            config.fetch_timeout_secs = parse_number(key, value)?;
        }
        "extractor.min_site_text_len" => {
            config.extractor.min_site_text_len = parse_number(key, value)?;
        }
        "extractor.char_threshold" => {
            config.extractor.char_threshold = parse_number(key, value)?;
        }
        "extractor.title_max_chars" => {
            config.extractor.title_max_chars = parse_number(key, value)?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .ok()
        .with_context(|| format!("Invalid value for {}. Use a whole number.", key))
}
