//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use strata::output::OutputConfig;

use crate::commands::{self, Context};

/// Strata - Inspect and repair layered project resources
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the strata.yaml configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory of the local store, overriding the configuration
    #[arg(long, global = true, value_name = "DIR", env = "STRATA_STORAGE")]
    storage: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG wins when set
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a schema against its ancestor chain
    Compile(commands::compile::CompileArgs),

    /// Check every schema of an environment for broken chains
    Validate(commands::validate::ValidateArgs),

    /// Display the media tree of an environment
    Tree(commands::tree::TreeArgs),

    /// Print the canonical view of a resource class
    Resolve(commands::resolve::ResolveArgs),

    /// Write or delete a single item of a resource class
    SetItem(commands::set_item::SetItemArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let ctx = Context {
            config_path: self.config,
            storage: self.storage,
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Compile(args) => commands::compile::execute(args, &ctx),
            Commands::Validate(args) => commands::validate::execute(args, &ctx),
            Commands::Tree(args) => commands::tree::execute(args, &ctx),
            Commands::Resolve(args) => commands::resolve::execute(args, &ctx),
            Commands::SetItem(args) => commands::set_item::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when embedded in tests
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
