//! Use Case Factory
//!
//! Creates use cases with infrastructure dependencies wired up.
//! This is the dependency injection point for the application.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::{DeployUseCase, MaintenanceUseCase, RollbackUseCase};
use crate::config::cache_dir;
use crate::domain::entities::Configuration;
use crate::domain::ports::{Connector, DeployEventSink};
use crate::domain::value_objects::{CancelFlag, Transport};
use crate::error::{CapstanError, CapstanResult};
use crate::infrastructure::{
    fetcher_for, CommandRunner, ConsoleEventSink, JsonEventSink, LocalConnector, SshConnector,
};

use super::terminal::TerminalCapabilities;

/// Sandbox root for the local transport
pub const LOCAL_ROOT_ENV: &str = "CAPSTAN_LOCAL_ROOT";

/// Create a command runner honouring the configured timeout
pub fn create_runner(config: &Configuration, cancel: CancelFlag) -> CommandRunner {
    CommandRunner::new(config.command_timeout, cancel)
}

/// Create the connector for the configured transport
pub fn create_connector(config: &Configuration, cancel: CancelFlag) -> Box<dyn Connector> {
    let runner = create_runner(config, cancel);
    match config.transport {
        Transport::Ssh => Box::new(SshConnector::new(
            config.ssh.clone(),
            config.user.clone(),
            runner,
        )),
        Transport::Local => Box::new(LocalConnector::new(local_root(), runner)),
    }
}

fn local_root() -> Option<PathBuf> {
    std::env::var_os(LOCAL_ROOT_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Reject a local transport that would put several hosts in one place
pub fn check_transport(config: &Configuration) -> CapstanResult<()> {
    check_local_hosts(config, local_root().as_deref())
}

fn check_local_hosts(config: &Configuration, root: Option<&Path>) -> CapstanResult<()> {
    if config.transport != Transport::Local || root.is_some() {
        return Ok(());
    }
    match config.registry.all_hosts().len() {
        0 | 1 => Ok(()),
        n => Err(CapstanError::SharedLocalRoot(n)),
    }
}

/// Create a deploy use case with all dependencies wired up
///
/// `config_path` anchors a relative local repository; checkouts for the
/// `copy` strategy live under the capstan cache directory.
pub fn create_deploy_use_case<'a>(
    config: &'a Configuration,
    config_path: &Path,
    cancel: CancelFlag,
) -> DeployUseCase<'a> {
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let cache = cache_dir().unwrap_or_else(|| base_dir.join(".capstan"));
    let fetcher = fetcher_for(config, create_runner(config, cancel.clone()), base_dir, &cache);

    DeployUseCase::new(config, create_connector(config, cancel.clone()), fetcher, cancel)
}

pub fn create_rollback_use_case(config: &Configuration, cancel: CancelFlag) -> RollbackUseCase<'_> {
    RollbackUseCase::new(config, create_connector(config, cancel.clone()), cancel)
}

pub fn create_maintenance_use_case(
    config: &Configuration,
    cancel: CancelFlag,
) -> MaintenanceUseCase<'_> {
    MaintenanceUseCase::new(config, create_connector(config, cancel))
}

/// NDJSON on stdout for `--json`, styled progress otherwise
pub fn create_event_sink(
    json: bool,
    command: &str,
    caps: TerminalCapabilities,
    verbose: u8,
) -> Arc<dyn DeployEventSink> {
    if json {
        Arc::new(JsonEventSink::stdout(command))
    } else {
        Arc::new(ConsoleEventSink::stdout(
            caps.supports_color,
            caps.supports_unicode,
            verbose > 0,
        ))
    }
}
