//! Capstan CLI - release-based remote deployment orchestrator
//!
//! Usage: capstan [OPTIONS] <COMMAND>
//!
//! Commands:
//!   deploy    Deploy a new release to every selected host
//!   setup     Create releases/ and shared/ on every selected host
//!   rollback  Point current back at the previous release and restart
//!   cleanup   Delete releases outside the retention window
//!   releases  List releases per host
//!   check     Validate the configuration and print roles, hosts and hooks
//!
//! Exit codes: 0 when every host succeeded, 1 when any host failed, 2 for
//! configuration and other pre-flight errors, 130 when interrupted.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use capstan::domain::value_objects::CancelFlag;
use capstan::presentation::{detect_capabilities, Cli, Commands};

mod commands;

use commands::{CommandContext, Status};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancelFlag::new();
    install_interrupt_handler(cancel.clone());

    let caps = detect_capabilities().with_color(cli.color);
    let result = CommandContext::load(&cli, caps, cancel).and_then(|ctx| match cli.command {
        Commands::Deploy { dry_run: true } => commands::deploy::plan(&ctx),
        Commands::Deploy { dry_run: false } => commands::deploy::run(&ctx),
        Commands::Setup => commands::setup::run(&ctx),
        Commands::Rollback => commands::rollback::run(&ctx),
        Commands::Cleanup => commands::cleanup::run(&ctx),
        Commands::Releases => commands::releases::run(&ctx),
        Commands::Check => commands::check::run(&ctx),
    });

    match result {
        Ok(status) => status.exit_code(),
        Err(err) => {
            commands::print_error(&err, cli.json, caps);
            Status::PreflightFailed.exit_code()
        }
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("capstan={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// First Ctrl-C asks running hosts to stop after their current step;
/// the second exits immediately.
fn install_interrupt_handler(cancel: CancelFlag) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!("Interrupted; stopping after the current step (Ctrl-C again to abort)");
        cancel.cancel();
    });
    if let Err(e) = result {
        tracing::warn!("could not install Ctrl-C handler: {}", e);
    }
}
