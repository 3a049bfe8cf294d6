//! ForgeArt CLI - Collection render driver
//!
//! Commands: run, attributes, kinds
//! Outputs JSON to stdout, logs to stderr
//! Exit 1 on bad input, 2 on pipeline failure

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use forgeart_core::{
    load_contributions, AttributesRenderer, CollectionPipeline, EngineConfig, PayloadKind,
};

#[derive(Parser)]
#[command(name = "forgeart-cli")]
#[command(about = "ForgeArt CLI - Layered Collection Renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate, composite and export a collection
    Run {
        /// Engine config (JSON)
        #[arg(short, long, default_value = "forgeart.json")]
        config: PathBuf,

        /// Contributions per item (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print merged attributes without rendering
    Attributes {
        /// Contributions per item (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Category to leave out (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// List accepted payload kinds and their aliases
    Kinds,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn failure(code: u8, message: String) -> ExitCode {
    error!("{}", message);
    let output = serde_json::json!({
        "success": false,
        "error": message,
    });
    println!("{}", output);
    ExitCode::from(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, input } => {
            let config = match EngineConfig::load(&config) {
                Ok(c) => c,
                Err(e) => return failure(1, e.to_string()),
            };
            let contributions = match load_contributions(&input) {
                Ok(c) => c,
                Err(e) => return failure(1, e.to_string()),
            };

            match CollectionPipeline::new(config).run(contributions) {
                Ok(manifest) => print_json(&serde_json::json!({
                    "success": true,
                    "manifest": manifest,
                })),
                Err(e) => failure(2, e.to_string()),
            }
        }

        Commands::Attributes { input, exclude } => {
            let contributions = match load_contributions(&input) {
                Ok(c) => c,
                Err(e) => return failure(1, e.to_string()),
            };

            let renders = AttributesRenderer::new(Arc::new(contributions))
                .with_exclude_parts(exclude)
                .render();

            match renders {
                Ok(renders) => {
                    let merged: BTreeMap<_, _> = renders
                        .iter()
                        .filter_map(|(item_id, outputs)| {
                            outputs.first().and_then(|r| r.as_attributes()).map(|a| (item_id, a))
                        })
                        .collect();
                    print_json(&merged)
                }
                Err(e) => failure(2, e.to_string()),
            }
        }

        Commands::Kinds => {
            let kinds: Vec<_> = PayloadKind::ALL
                .iter()
                .map(|kind| {
                    serde_json::json!({
                        "kind": kind.tag(),
                        "aliases": kind.aliases().collect::<Vec<_>>(),
                    })
                })
                .collect();
            print_json(&kinds)
        }
    }
}
