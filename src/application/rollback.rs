//! Rollback Use Case
//!
//! Per host: point `current` at the newest healthy release older than the
//! active one, restart, then delete the release rolled back from. If the
//! restart fails, `current` goes back to where it was.

use std::sync::Arc;

use crate::application::deploy::{app_root, DeployReport, HostOutcome};
use crate::application::fanout::run_on_hosts;
use crate::application::lock::{local_user, DeployLock};
use crate::application::release_manager::ReleaseManager;
use crate::application::targets::{select_hosts, TargetFilter};
use crate::domain::entities::{Configuration, Release, ReleaseStatus};
use crate::domain::ports::{Connector, DeployEvent, DeployEventSink, NoopEventSink, Remote};
use crate::domain::value_objects::CancelFlag;
use crate::error::{CapstanResult, DeployError};

pub struct RollbackUseCase<'a> {
    config: &'a Configuration,
    connector: Box<dyn Connector>,
    cancel: CancelFlag,
}

impl<'a> RollbackUseCase<'a> {
    pub fn new(config: &'a Configuration, connector: Box<dyn Connector>, cancel: CancelFlag) -> Self {
        Self {
            config,
            connector,
            cancel,
        }
    }

    pub fn execute(&self, targets: &TargetFilter) -> CapstanResult<DeployReport> {
        self.execute_with_events(targets, Arc::new(NoopEventSink))
    }

    pub fn execute_with_events(
        &self,
        targets: &TargetFilter,
        event_sink: Arc<dyn DeployEventSink>,
    ) -> CapstanResult<DeployReport> {
        let hosts = select_hosts(&self.config.registry, targets)?;
        let sink = event_sink.as_ref();
        Ok(run_on_hosts(
            "rollback",
            self.config,
            &hosts,
            self.connector.as_ref(),
            sink,
            |remote, outcome| self.rollback_host(remote, outcome, sink),
        ))
    }

    fn rollback_host(
        &self,
        remote: &dyn Remote,
        outcome: &mut HostOutcome,
        sink: &dyn DeployEventSink,
    ) -> Result<(), DeployError> {
        let paths = self.config.paths();
        let _lock = DeployLock::acquire(remote, &paths).map_err(DeployError::Lock)?;
        let manager = ReleaseManager::new(remote, paths).with_sudo(self.config.use_sudo);
        let host = outcome.host.address().to_string();

        let releases = manager
            .list()
            .map_err(|e| DeployError::Rollback(format!("could not list releases: {}", e)))?;
        let (from, to) = rollback_target(&releases)?;
        let from = from.id().clone();
        let to = to.id().clone();
        outcome.previous = Some(from.clone());
        outcome.release = Some(to.clone());

        if self.cancel.is_cancelled() {
            return Err(DeployError::Interrupted);
        }
        manager.promote(&to).map_err(DeployError::Promotion)?;
        sink.on_event(DeployEvent::Promoted {
            host: host.clone(),
            release: to.to_string(),
            previous: Some(from.to_string()),
        });

        if let Some(command) = &self.config.restart_command {
            let cwd = app_root(&manager.paths().current(), &self.config.app_path);
            if let Err(e) = remote.exec(&self.config.try_sudo(command), Some(&cwd)) {
                match manager.restore(Some(&from)) {
                    Ok(()) => sink.on_event(DeployEvent::RolledBack {
                        host: host.clone(),
                        restored: Some(from.to_string()),
                    }),
                    Err(re) => outcome.warn(sink, format!("could not restore current: {}", re)),
                }
                return Err(DeployError::Restart(e));
            }
        }

        match manager.delete(&from) {
            Ok(()) => {
                sink.on_event(DeployEvent::ReleaseDeleted {
                    host: host.clone(),
                    release: from.to_string(),
                });
                outcome.deleted.push(from.clone());
            }
            Err(e) => outcome.warn(sink, format!("could not delete release {}: {}", from, e)),
        }

        let line = format!("{} rolled back to release {}\n", local_user(), to);
        let log = manager.paths().revisions_log();
        if let Err(e) = remote.append_file(&log, &line) {
            outcome.warn(sink, format!("could not write {}: {}", log.display(), e));
        }
        Ok(())
    }
}

/// The active release and the newest healthy release older than it
fn rollback_target(releases: &[Release]) -> Result<(&Release, &Release), DeployError> {
    let active = releases
        .iter()
        .find(|r| r.is_active())
        .ok_or_else(|| DeployError::Rollback("no current release".to_string()))?;
    let target = releases
        .iter()
        .filter(|r| r.status() == ReleaseStatus::Superseded && r.id() < active.id())
        .max_by(|a, b| a.id().cmp(b.id()))
        .ok_or_else(|| {
            DeployError::Rollback(format!(
                "no release older than {} to roll back to",
                active.id()
            ))
        })?;
    Ok((active, target))
}
