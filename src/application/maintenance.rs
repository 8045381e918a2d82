//! Maintenance use cases: `setup`, `cleanup` and `releases`

use std::sync::Arc;

use crate::application::deploy::{DeployReport, HostOutcome};
use crate::application::fanout::{for_each_host, run_on_hosts};
use crate::application::lock::DeployLock;
use crate::application::pruner::RetentionPruner;
use crate::application::release_manager::ReleaseManager;
use crate::application::targets::{select_hosts, TargetFilter};
use crate::domain::entities::{Configuration, Release};
use crate::domain::ports::{Connector, DeployEvent, DeployEventSink, NoopEventSink, Remote, RemoteError};
use crate::domain::services::RetentionPolicy;
use crate::domain::value_objects::Host;
use crate::error::{CapstanResult, DeployError};

/// Releases found on one host
#[derive(Debug)]
pub struct HostReleases {
    pub host: Host,
    pub releases: Result<Vec<Release>, RemoteError>,
}

pub struct MaintenanceUseCase<'a> {
    config: &'a Configuration,
    connector: Box<dyn Connector>,
}

impl<'a> MaintenanceUseCase<'a> {
    pub fn new(config: &'a Configuration, connector: Box<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// Create the deploy layout on every host
    pub fn setup(&self, targets: &TargetFilter) -> CapstanResult<DeployReport> {
        self.setup_with_events(targets, Arc::new(NoopEventSink))
    }

    pub fn setup_with_events(
        &self,
        targets: &TargetFilter,
        event_sink: Arc<dyn DeployEventSink>,
    ) -> CapstanResult<DeployReport> {
        let hosts = select_hosts(&self.config.registry, targets)?;
        Ok(run_on_hosts(
            "setup",
            self.config,
            &hosts,
            self.connector.as_ref(),
            event_sink.as_ref(),
            |remote, _outcome| {
                ReleaseManager::new(remote, self.config.paths())
                    .setup(&self.config.linked_dirs, &self.config.linked_files)
                    .map_err(DeployError::Write)
            },
        ))
    }

    /// Run the retention pruner on every host
    pub fn cleanup(&self, targets: &TargetFilter) -> CapstanResult<DeployReport> {
        self.cleanup_with_events(targets, Arc::new(NoopEventSink))
    }

    pub fn cleanup_with_events(
        &self,
        targets: &TargetFilter,
        event_sink: Arc<dyn DeployEventSink>,
    ) -> CapstanResult<DeployReport> {
        let hosts = select_hosts(&self.config.registry, targets)?;
        let sink = event_sink.as_ref();
        Ok(run_on_hosts(
            "cleanup",
            self.config,
            &hosts,
            self.connector.as_ref(),
            sink,
            |remote, outcome| self.cleanup_host(remote, outcome, sink),
        ))
    }

    fn cleanup_host(
        &self,
        remote: &dyn Remote,
        outcome: &mut HostOutcome,
        sink: &dyn DeployEventSink,
    ) -> Result<(), DeployError> {
        let paths = self.config.paths();
        let _lock = DeployLock::acquire(remote, &paths).map_err(DeployError::Lock)?;
        let manager = ReleaseManager::new(remote, paths).with_sudo(self.config.use_sudo);
        let policy = RetentionPolicy::new(self.config.keep_releases);

        let pruned = RetentionPruner::new(&manager, policy)
            .prune(None)
            .map_err(DeployError::Prune)?;
        for id in pruned.deleted {
            sink.on_event(DeployEvent::ReleaseDeleted {
                host: outcome.host.address().to_string(),
                release: id.to_string(),
            });
            outcome.deleted.push(id);
        }
        for (id, e) in pruned.failed {
            outcome.warn(sink, format!("could not delete release {}: {}", id, e));
        }
        Ok(())
    }

    /// List releases per host. Read-only, so no lock is taken.
    pub fn releases(&self, targets: &TargetFilter) -> CapstanResult<Vec<HostReleases>> {
        let hosts = select_hosts(&self.config.registry, targets)?;
        Ok(for_each_host(&hosts, |host| {
            let remote = self.connector.connect(host);
            let releases = ReleaseManager::new(remote.as_ref(), self.config.paths()).list();
            HostReleases {
                host: host.clone(),
                releases,
            }
        }))
    }
}
