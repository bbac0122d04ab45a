//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use crate::build::{Format, Target};
use crate::logger::init_logger;
use crate::toolchain::check_host_os;
use crate::watch::WatchOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_TARGET_FAILED: u8 = 3;
pub(crate) const EXIT_UNSUPPORTED_PLATFORM: u8 = 11;

/// zbundle - bundle and minify static assets
#[derive(Parser)]
#[command(name = "zbundle")]
#[command(about = "zbundle - configuration-driven static asset bundler")]
#[command(version)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every target of the configuration file
    Build {
        /// Configuration file (default: zbundle.json in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Build every target, then rebuild affected targets when sources change
    Watch {
        /// Configuration file (default: zbundle.json in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Ignore further changes for this long after one is handled
        #[arg(long, default_value_t = 1000)]
        debounce_ms: u64,

        /// Wait this long after a change before rebuilding
        #[arg(long, default_value_t = 250)]
        settle_ms: u64,
    },

    /// Build a single target described on the command line
    Run {
        /// Compilation mode: css, js, scss, sass or md
        #[arg(short, long)]
        mode: Format,

        /// Label for the built resource
        #[arg(short, long)]
        label: Option<String>,

        /// Files, directories or links to include, relative to the current directory
        #[arg(short, long, required = true, num_args = 1..)]
        include: Vec<String>,

        /// Output paths
        #[arg(short, long, required = true, num_args = 1..)]
        output: Vec<String>,

        /// Substrings excluding resolved paths
        #[arg(short = 'x', long, num_args = 1..)]
        exclude: Vec<String>,
    },
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet, cli.no_color);

    if let Err(e) = check_host_os() {
        error!("{}", e);
        return ExitCode::from(EXIT_UNSUPPORTED_PLATFORM);
    }

    match cli.command {
        Commands::Build { config } => build::run_build(config.as_deref()),
        Commands::Watch { config, debounce_ms, settle_ms } => {
            let options = WatchOptions {
                debounce: Duration::from_millis(debounce_ms),
                settle: Duration::from_millis(settle_ms),
            };
            build::run_watch(config.as_deref(), options)
        }
        Commands::Run { mode, label, include, output, exclude } => {
            let mut target = Target::new(mode, include, output).with_excludes(exclude);
            target.label = label;
            build::run_target(target)
        }
    }
}
