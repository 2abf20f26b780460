// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - retrieval-augmented chat backend.
//!
//! This is the binary entry point: the gateway server plus knowledge base
//! maintenance commands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod kb;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mnemo_config::model::MnemoConfig;

/// Mnemo - retrieval-augmented chat backend.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the WebSocket and REST gateway.
    Serve,
    /// Ingest a local file into a knowledge base.
    Ingest {
        /// Knowledge base name. Created when missing.
        kb: String,
        /// File to copy into the knowledge base and index.
        path: PathBuf,
    },
    /// Manage knowledge bases.
    Kb {
        #[command(subcommand)]
        action: KbCommands,
    },
}

#[derive(Subcommand, Debug)]
enum KbCommands {
    /// List knowledge bases with document and chunk counts.
    List,
    /// Create an empty knowledge base.
    Create { name: String },
    /// Delete a knowledge base with its files and vectors.
    Delete { name: String },
    /// Re-extract and re-index every document.
    Rebuild { name: String },
}

fn load_config(path: Option<&PathBuf>) -> MnemoConfig {
    let loaded = match path {
        Some(path) => mnemo_config::load_and_validate_path(path),
        None => mnemo_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ingest { kb, path }) => kb::run_ingest(&config, &kb, &path).await,
        Some(Commands::Kb { action }) => match action {
            KbCommands::List => kb::run_list(&config).await,
            KbCommands::Create { name } => kb::run_create(&config, &name).await,
            KbCommands::Delete { name } => kb::run_delete(&config, &name).await,
            KbCommands::Rebuild { name } => kb::run_rebuild(&config, &name).await,
        },
        None => {
            println!("mnemo: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = mnemo_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.agent.name, "mnemo");
    }

    #[test]
    fn cli_parses_kb_commands() {
        let cli = Cli::try_parse_from(["mnemo", "kb", "rebuild", "manuals"]).unwrap();
        match cli.command {
            Some(Commands::Kb {
                action: KbCommands::Rebuild { name },
            }) => assert_eq!(name, "manuals"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_ingest_with_config() {
        let cli = Cli::try_parse_from([
            "mnemo",
            "ingest",
            "docs",
            "notes.md",
            "--config",
            "/tmp/mnemo.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mnemo.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Ingest { ref kb, .. }) if kb == "docs"
        ));
    }

    #[test]
    fn cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
