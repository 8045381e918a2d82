//! Command handlers
//!
//! Each handler takes the loaded `CommandContext`, runs one use case and
//! reports a `Status`. Pre-flight failures come back as errors.

pub mod check;
pub mod cleanup;
pub mod deploy;
pub mod releases;
pub mod rollback;
pub mod setup;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use crossterm::style::Stylize;

use capstan::application::{DeployReport, TargetFilter};
use capstan::config::{load_with_warnings, ConfigOverrides};
use capstan::domain::entities::Configuration;
use capstan::domain::ports::DeployEventSink;
use capstan::domain::value_objects::CancelFlag;
use capstan::error::DeployError;
use capstan::presentation::factory::{check_transport, create_event_sink};
use capstan::presentation::{Cli, TerminalCapabilities, TextRenderer};

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    HostsFailed,
    PreflightFailed,
    Interrupted,
}

impl Status {
    pub fn from_report(report: &DeployReport, cancel: &CancelFlag) -> Self {
        if report.is_success() {
            Status::Success
        } else if cancel.is_cancelled()
            || report
                .failures()
                .any(|(_, e)| matches!(e, DeployError::Interrupted))
        {
            Status::Interrupted
        } else {
            Status::HostsFailed
        }
    }

    pub fn exit_code(self) -> ExitCode {
        let code: u8 = match self {
            Status::Success => 0,
            Status::HostsFailed => 1,
            Status::PreflightFailed => 2,
            Status::Interrupted => 130,
        };
        ExitCode::from(code)
    }
}

/// Everything a handler needs, resolved once from the command line
pub struct CommandContext {
    pub config: Configuration,
    pub config_path: PathBuf,
    pub targets: TargetFilter,
    pub caps: TerminalCapabilities,
    pub json: bool,
    pub verbose: u8,
    pub yes: bool,
    pub cancel: CancelFlag,
    pub command: &'static str,
}

impl CommandContext {
    /// Load the configuration with CLI > environment > file precedence
    pub fn load(cli: &Cli, caps: TerminalCapabilities, cancel: CancelFlag) -> Result<Self> {
        let from_cli = ConfigOverrides {
            branch: cli.branch.clone(),
            ..ConfigOverrides::default()
        };
        let overrides = from_cli.or(ConfigOverrides::from_env()?);
        let (config, warnings) = load_with_warnings(&cli.config, &overrides)?;

        for warning in &warnings {
            tracing::warn!("{}", warning);
            if !cli.json {
                let label = if caps.supports_color {
                    "warning:".yellow().to_string()
                } else {
                    "warning:".to_string()
                };
                eprintln!("{} {}", label, warning);
            }
        }
        check_transport(&config)?;

        Ok(Self {
            config,
            config_path: cli.config.clone(),
            targets: TargetFilter::new()
                .with_roles(cli.roles.clone())
                .with_hosts(cli.hosts.clone()),
            caps,
            json: cli.json,
            verbose: cli.verbose,
            yes: cli.yes,
            cancel,
            command: cli.command.name(),
        })
    }

    pub fn renderer(&self) -> TextRenderer {
        TextRenderer::new(self.caps)
    }

    pub fn sink(&self) -> Arc<dyn DeployEventSink> {
        create_event_sink(self.json, self.command, self.caps, self.verbose)
    }

    /// Print the closing summary (the NDJSON stream already has one)
    pub fn finish(&self, report: &DeployReport) -> Status {
        if !self.json {
            print!("{}", self.renderer().render_summary(self.command, report));
        }
        Status::from_report(report, &self.cancel)
    }
}

pub fn print_error(err: &anyhow::Error, json: bool, caps: TerminalCapabilities) {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        println!(
            "{}",
            serde_json::json!({ "event": "error", "message": err.to_string(), "causes": causes })
        );
        return;
    }

    let label = if caps.supports_color {
        "Error:".red().bold().to_string()
    } else {
        "Error:".to_string()
    };
    eprintln!("{} {}", label, err);
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan::application::HostOutcome;
    use capstan::domain::value_objects::Host;

    fn failed(host: &str, error: DeployError) -> HostOutcome {
        let mut outcome = HostOutcome::new(Host::new(host));
        outcome.error = Some(error);
        outcome
    }

    #[test]
    fn status_from_successful_report() {
        let report = DeployReport::new(vec![HostOutcome::new(Host::new("web1"))]);
        assert_eq!(Status::from_report(&report, &CancelFlag::new()), Status::Success);
    }

    #[test]
    fn status_from_host_failure() {
        let report = DeployReport::new(vec![
            HostOutcome::new(Host::new("web1")),
            failed("web2", DeployError::Rollback("no current release".to_string())),
        ]);
        assert_eq!(
            Status::from_report(&report, &CancelFlag::new()),
            Status::HostsFailed
        );
    }

    #[test]
    fn status_from_interrupted_host() {
        let report = DeployReport::new(vec![failed("web1", DeployError::Interrupted)]);
        assert_eq!(
            Status::from_report(&report, &CancelFlag::new()),
            Status::Interrupted
        );
    }
}
