//! CLI Argument Parsing
//!
//! This module defines the CLI interface using clap.
//!
//! ## Design Notes
//!
//! - Global flags (--config, --json, --color, --verbose, target filters)
//!   are inherited by all subcommands
//! - `rollback` asks for confirmation unless `--yes` is given or stdin is
//!   not a terminal

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// Capstan - release-based remote deployment orchestrator
#[derive(Parser, Debug)]
#[command(name = "capstan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit NDJSON events on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorWhen>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only act on hosts in these roles
    #[arg(long, global = true, value_delimiter = ',')]
    pub roles: Vec<String>,

    /// Only act on these hosts
    #[arg(long, global = true, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Deploy this branch instead of the configured one
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Deploy a new release to every selected host
    Deploy {
        /// Print the execution plan per host without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Create releases/ and shared/ on every selected host
    Setup,

    /// Point current back at the previous release and restart
    Rollback,

    /// Delete releases outside the retention window
    Cleanup,

    /// List releases per host
    Releases,

    /// Validate the configuration and print roles, hosts and hooks
    Check,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Deploy { .. } => "deploy",
            Commands::Setup => "setup",
            Commands::Rollback => "rollback",
            Commands::Cleanup => "cleanup",
            Commands::Releases => "releases",
            Commands::Check => "check",
        }
    }
}
