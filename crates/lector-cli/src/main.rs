//! Lector CLI
//!
//! Command-line interface for Lector - capture web pages and notes as
//! Markdown documents and read them later.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lector_core::{Config, DocumentSource, DocumentStore, ExtractError, StorageError};

mod commands;
mod editor;
mod fetch;
mod output;

use output::{Output, OutputFormat};

/// Filter used when LECTOR_LOG is unset
const DEFAULT_LOG_FILTER: &str = "lector_core=warn,lector_cli=warn";

const VERBOSE_LOG_FILTER: &str = "lector_core=debug,lector_cli=debug";

#[derive(Parser)]
#[command(name = "lector")]
#[command(about = "Lector - Capture web pages and notes as Markdown documents")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging to stderr (or the configured log file)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document from text (stdin or $EDITOR when --content is omitted)
    Add {
        /// Document title
        #[arg(short = 'T', long)]
        title: String,
        /// Markdown content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Extract a web page into Markdown
    Extract {
        /// Page URL
        url: String,
        /// Store the result as a document
        #[arg(short, long)]
        save: bool,
    },
    /// List documents, most recently updated first
    #[command(alias = "ls")]
    List {
        /// Only documents from this source (manual or web)
        #[arg(short, long)]
        source: Option<DocumentSource>,
        /// Show at most N documents
        #[arg(short, long, value_name = "N")]
        recent: Option<usize>,
    },
    /// Show document details and content
    Show {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Print a document's content and mark it read
    Read {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Open a web document's source page in the browser
    Open {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Edit a document (opens $EDITOR when no flags are given)
    Edit {
        /// Document ID (full or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        /// Document ID (full or prefix)
        id: String,
    },
    /// Delete all documents
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search titles and content
    Search {
        /// Search query
        query: String,
    },
    /// Show the most recently read document
    Last,
    /// Show status (document counts, storage location)
    Status,
    /// Dispatch a reading message given as JSON
    Message {
        /// Request, e.g. '{"action":"getDocument","id":"..."}'
        request: String,
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
        /// Configuration key (data_dir, log_file, fetch_timeout_secs, extractor.*)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(err) = run(cli, &output).await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = error_hint(&err) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands work even when the stored config is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);
    debug!(data_dir = ?config.data_dir, "Loaded configuration");

    let mut store = DocumentStore::open_with_config(&config);

    match cli.command {
        Commands::Add { title, content } => {
            commands::document::add(&mut store, title, content, output)
        }
        Commands::Extract { url, save } => {
            commands::extract::extract(&mut store, &config, url, save, output).await
        }
        Commands::List { source, recent } => {
            commands::document::list(&store, source, recent, output)
        }
        Commands::Show { id } => commands::document::show(&store, id, output),
        Commands::Read { id } => commands::document::read(&mut store, id, output),
        Commands::Open { id } => commands::document::open(&mut store, id, output),
        Commands::Edit { id, title, content } => {
            commands::document::edit(&mut store, id, title, content, output)
        }
        Commands::Delete { id } => commands::document::delete(&mut store, id, output),
        Commands::Clear { yes } => commands::document::clear(&mut store, yes, output),
        Commands::Search { query } => commands::document::search(&store, query, output),
        Commands::Last => commands::document::last(&store, output),
        Commands::Status => commands::status::show(&store, &config, output),
        Commands::Message { request } => {
            commands::message::dispatch(&mut store, request, output)
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Advice for errors the user can act on
fn error_hint(err: &anyhow::Error) -> Option<&'static str> {
    for cause in err.chain() {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            debug!(recoverable = storage.is_recoverable(), "Storage failure");
            return storage.recovery_suggestion();
        }
        if let Some(extract) = cause.downcast_ref::<ExtractError>() {
            return extract
                .is_unsupported_page()
                .then_some("Only http and https pages can be extracted.");
        }
    }
    None
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
/// LECTOR_LOG sets the filter; --verbose forces debug. Logs go to
/// config.log_file when set, otherwise stderr.
fn init_logging(config: &Config, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_env("LECTOR_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    if let Some(ref log_path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(log_file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(log_file)
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
