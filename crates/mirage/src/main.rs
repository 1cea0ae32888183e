// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mirage - a synthetic social feed generator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod generate;
mod serve;
mod shutdown;

use clap::{Parser, Subcommand};
use mirage_config::MirageConfig;
use mirage_core::types::{Category, ContentFormat};

/// Mirage - a synthetic social feed generator.
#[derive(Parser, Debug)]
#[command(name = "mirage", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Generate one batch and print each event as a JSON line.
    Generate {
        /// Who the feed is for.
        #[arg(long)]
        persona: String,
        /// Restrict formats (repeatable).
        #[arg(long = "format")]
        formats: Vec<ContentFormat>,
        /// Restrict categories (repeatable).
        #[arg(long = "category")]
        categories: Vec<Category>,
        /// Number of items; defaults to `pipeline.default_items`.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mirage_config::load_and_validate_path(path),
        None => mirage_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mirage_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.app.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Generate {
            persona,
            formats,
            categories,
            count,
        }) => {
            init_tracing(&config.app.log_level);
            let count = count.unwrap_or(config.pipeline.default_items);
            generate::run_generate(config, persona, formats, categories, count).await
        }
        Some(Commands::Config) => match render_config(&config) {
            Ok(text) => {
                print!("{text}");
                Ok(())
            }
            Err(e) => Err(e),
        },
        None => {
            println!("mirage: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("mirage: {e}");
        std::process::exit(1);
    }
}

/// Renders `config` as TOML with the API key masked.
fn render_config(config: &MirageConfig) -> Result<String, mirage_core::MirageError> {
    let mut redacted = config.clone();
    if redacted.gemini.api_key.is_some() {
        redacted.gemini.api_key = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&redacted)
        .map_err(|e| mirage_core::MirageError::Config(format!("failed to render config: {e}")))
}

/// Initializes the tracing subscriber on stderr with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mirage={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
