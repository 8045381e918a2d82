//! Deploy Use Case
//!
//! Orchestrates the deploy flow on every selected host, one thread per
//! host:
//! 1. Take the host's deploy lock
//! 2. Walk the execution plan (stage bodies with their hooks)
//! 3. On failure, undo the promotion if it happened and mark the new
//!    release failed
//! 4. Release the lock
//!
//! Stage bodies:
//! - `deploy:start` - ensure `releases/` and `shared/` exist
//! - `deploy:update_code` - create a pending release, fetch into it, link
//!   shared paths
//! - `deploy:symlink` - atomically point `current` at the release
//! - `deploy:restart` - run `restart_command` from the new app root
//! - `deploy:finished` - append to `revisions.log`

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::fanout::run_on_hosts;
use crate::application::lock::{local_user, DeployLock};
use crate::application::pruner::RetentionPruner;
use crate::application::release_manager::ReleaseManager;
use crate::application::targets::select_hosts;
use crate::domain::entities::{sudo_wrap, Configuration, Hook, HookAction, Release};
use crate::domain::ports::{
    Connector, DeployEvent, DeployEventSink, NoopEventSink, Remote, RemoteError, SourceFetcher,
};
use crate::domain::services::{ExecutionPlan, RetentionPolicy, Step};
use crate::domain::value_objects::{CancelFlag, Host, ReleaseId, Stage};
use crate::error::{CapstanResult, DeployError};

use super::options::DeployOptions;
use super::result::{DeployReport, HostOutcome};

/// The steps one host would run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlan {
    pub host: Host,
    pub roles: BTreeSet<String>,
    pub steps: Vec<Step>,
}

/// Deploy use case - orchestrates the deploy flow
pub struct DeployUseCase<'a> {
    config: &'a Configuration,
    connector: Box<dyn Connector>,
    fetcher: Box<dyn SourceFetcher>,
    cancel: CancelFlag,
}

/// Mutable state of one host's run
struct HostRun<'r> {
    remote: &'r dyn Remote,
    manager: ReleaseManager<'r>,
    sink: &'r dyn DeployEventSink,
    release: Option<Release>,
    promoted: bool,
    restarted: bool,
    outcome: &'r mut HostOutcome,
}

impl HostRun<'_> {
    fn name(&self) -> String {
        self.outcome.host.address().to_string()
    }

    fn emit(&self, event: DeployEvent) {
        self.sink.on_event(event);
    }

    fn warn(&mut self, message: String) {
        self.outcome.warn(self.sink, message);
    }

    fn skip(&self, step: &Step, reason: &str) {
        if self.sink.wants_detailed_events() {
            self.emit(DeployEvent::StepSkipped {
                host: self.name(),
                step: step.label(),
                reason: reason.to_string(),
            });
        }
    }
}

impl<'a> DeployUseCase<'a> {
    pub fn new(
        config: &'a Configuration,
        connector: Box<dyn Connector>,
        fetcher: Box<dyn SourceFetcher>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            config,
            connector,
            fetcher,
            cancel,
        }
    }

    /// Resolve hosts and the steps each would run. Touches nothing.
    pub fn plan(&self, options: &DeployOptions) -> CapstanResult<Vec<HostPlan>> {
        let hosts = select_hosts(&self.config.registry, &options.targets)?;
        let plan = self.config.pipeline.plan();
        Ok(hosts
            .into_iter()
            .map(|host| {
                let roles = self.config.registry.roles_for(&host);
                let steps = plan.steps_for(&roles).cloned().collect();
                HostPlan { host, roles, steps }
            })
            .collect())
    }

    /// Execute the deploy use case
    pub fn execute(&self, options: &DeployOptions) -> CapstanResult<DeployReport> {
        self.execute_with_events(options, Arc::new(NoopEventSink))
    }

    /// Execute the deploy use case with event reporting
    pub fn execute_with_events(
        &self,
        options: &DeployOptions,
        event_sink: Arc<dyn DeployEventSink>,
    ) -> CapstanResult<DeployReport> {
        let hosts = select_hosts(&self.config.registry, &options.targets)?;
        let plan = self.config.pipeline.plan();
        let now = options.release_time.unwrap_or_else(Utc::now);

        tracing::info!(
            application = %self.config.application,
            hosts = hosts.len(),
            strategy = %self.fetcher.describe(),
            "deploy starting"
        );
        let sink = event_sink.as_ref();
        Ok(run_on_hosts(
            "deploy",
            self.config,
            &hosts,
            self.connector.as_ref(),
            sink,
            |remote, outcome| self.deploy_host(remote, outcome, &plan, now, sink),
        ))
    }

    fn deploy_host(
        &self,
        remote: &dyn Remote,
        outcome: &mut HostOutcome,
        plan: &ExecutionPlan,
        now: DateTime<Utc>,
        sink: &dyn DeployEventSink,
    ) -> Result<(), DeployError> {
        let paths = self.config.paths();
        let _lock = DeployLock::acquire(remote, &paths).map_err(DeployError::Lock)?;

        let mut run = HostRun {
            remote,
            manager: ReleaseManager::new(remote, paths).with_sudo(self.config.use_sudo),
            sink,
            release: None,
            promoted: false,
            restarted: false,
            outcome,
        };
        let result = self.run_plan(&mut run, plan, now);
        if result.is_err() {
            self.compensate(&mut run);
        }
        result
    }

    fn run_plan(
        &self,
        run: &mut HostRun<'_>,
        plan: &ExecutionPlan,
        now: DateTime<Utc>,
    ) -> Result<(), DeployError> {
        let roles = self.config.registry.roles_for(&run.outcome.host);
        for step in plan.steps_for(&roles) {
            if self.cancel.is_cancelled() {
                return Err(DeployError::Interrupted);
            }
            tracing::debug!(host = %run.outcome.host, step = %step.label(), "step");
            if run.sink.wants_detailed_events() {
                run.emit(DeployEvent::StepStarted {
                    host: run.name(),
                    step: step.label(),
                });
            }
            self.run_step(run, step, now)?;
        }
        Ok(())
    }

    fn run_step(
        &self,
        run: &mut HostRun<'_>,
        step: &Step,
        now: DateTime<Utc>,
    ) -> Result<(), DeployError> {
        match step {
            Step::Body(Stage::Start) => run
                .manager
                .setup(&self.config.linked_dirs, &self.config.linked_files)
                .map_err(DeployError::Write),
            Step::Body(Stage::UpdateCode) => self.update_code(run, now),
            Step::Body(Stage::Symlink) => self.symlink(run),
            Step::Body(Stage::Restart) => self.restart(run, step),
            Step::Body(Stage::Finished) => {
                self.record_revision(run);
                Ok(())
            }
            Step::Hook { hook, stage, .. } => self.run_hook(run, step, *stage, hook),
        }
    }

    fn update_code(&self, run: &mut HostRun<'_>, now: DateTime<Utc>) -> Result<(), DeployError> {
        let release = run.manager.create_release(now).map_err(DeployError::Write)?;
        run.emit(DeployEvent::ReleaseCreated {
            host: run.name(),
            release: release.id().to_string(),
        });
        run.outcome.release = Some(release.id().clone());
        run.release = Some(release.clone());

        let tree = self.fetcher.fetch(run.remote, release.path())?;
        let missing = run
            .manager
            .finalize(
                &release,
                &tree,
                &self.config.linked_dirs,
                &self.config.linked_files,
            )
            .map_err(DeployError::Write)?;
        for file in missing {
            run.warn(format!(
                "linked file shared/{} does not exist",
                file.display()
            ));
        }
        run.outcome.revision = Some(tree.revision);
        Ok(())
    }

    fn symlink(&self, run: &mut HostRun<'_>) -> Result<(), DeployError> {
        let id = match &run.release {
            Some(release) => release.id().clone(),
            None => {
                return Err(DeployError::Promotion(RemoteError::Io(io::Error::other(
                    "no release to promote",
                ))))
            }
        };

        let previous = run.manager.current().map_err(DeployError::Promotion)?;
        run.outcome.previous = previous.clone();
        // Restoring an unchanged `current` is harmless, so a half-done
        // promotion is compensated like a complete one
        run.promoted = true;
        run.manager.promote(&id).map_err(DeployError::Promotion)?;

        run.emit(DeployEvent::Promoted {
            host: run.name(),
            release: id.to_string(),
            previous: previous.map(|p| p.to_string()),
        });
        Ok(())
    }

    fn restart(&self, run: &mut HostRun<'_>, step: &Step) -> Result<(), DeployError> {
        let Some(command) = &self.config.restart_command else {
            run.skip(step, "no restart_command configured");
            return Ok(());
        };
        let cwd = app_root(&self.config.paths().current(), &self.config.app_path);
        run.remote
            .exec(&self.config.try_sudo(command), Some(&cwd))
            .map_err(DeployError::Restart)?;
        run.restarted = true;
        Ok(())
    }

    fn record_revision(&self, run: &mut HostRun<'_>) {
        let (Some(release), Some(revision)) = (&run.outcome.release, &run.outcome.revision) else {
            return;
        };
        let line = format!(
            "Branch {} (at {}) deployed as release {} by {}\n",
            self.config.branch,
            revision,
            release,
            local_user()
        );
        let log = self.config.paths().revisions_log();
        if let Err(e) = run.remote.append_file(&log, &line) {
            run.warn(format!("could not write {}: {}", log.display(), e));
        }
    }

    fn run_hook(
        &self,
        run: &mut HostRun<'_>,
        step: &Step,
        stage: Stage,
        hook: &Hook,
    ) -> Result<(), DeployError> {
        match hook.action() {
            HookAction::Cleanup => {
                self.cleanup(run);
                Ok(())
            }
            HookAction::Command { run: command, sudo } => {
                let cwd = self.hook_cwd(run, stage);
                run.remote
                    .exec(&sudo_wrap(command, *sudo), Some(&cwd))
                    .map(|_| ())
                    .map_err(|source| DeployError::Hook {
                        hook: step.label(),
                        source,
                    })
            }
        }
    }

    /// Hooks run from the newest app root that exists at their point in
    /// the plan
    fn hook_cwd(&self, run: &HostRun<'_>, stage: Stage) -> PathBuf {
        let paths = self.config.paths();
        if run.promoted && stage >= Stage::Symlink {
            app_root(&paths.current(), &self.config.app_path)
        } else if let Some(release) = &run.release {
            app_root(release.path(), &self.config.app_path)
        } else {
            paths.root().to_path_buf()
        }
    }

    /// The `deploy:cleanup` task. Never fails the deploy.
    fn cleanup(&self, run: &mut HostRun<'_>) {
        let policy = RetentionPolicy::new(self.config.keep_releases);
        // Once promoted the new release is active and protected anyway
        let in_flight = match (&run.release, run.promoted) {
            (Some(release), false) => Some(release.id().clone()),
            _ => None,
        };
        let result = RetentionPruner::new(&run.manager, policy).prune(in_flight.as_ref());

        match result {
            Ok(pruned) => {
                for id in pruned.deleted {
                    run.emit(DeployEvent::ReleaseDeleted {
                        host: run.name(),
                        release: id.to_string(),
                    });
                    run.outcome.deleted.push(id);
                }
                for (id, e) in pruned.failed {
                    run.warn(format!("could not delete release {}: {}", id, e));
                }
            }
            Err(e) => run.warn(DeployError::Prune(e).to_string()),
        }
    }

    /// Undo what the failed run changed. Problems here become warnings;
    /// the original error is what the host reports.
    fn compensate(&self, run: &mut HostRun<'_>) {
        if run.promoted {
            let previous = run.outcome.previous.clone();
            match run.manager.restore(previous.as_ref()) {
                Ok(()) => {
                    run.emit(DeployEvent::RolledBack {
                        host: run.name(),
                        restored: previous.as_ref().map(ToString::to_string),
                    });
                    if run.restarted {
                        self.restart_after_restore(run, previous.as_ref());
                    }
                }
                Err(e) => run.warn(format!("could not restore current: {}", e)),
            }
        }

        if let Some(id) = run.release.as_ref().map(|r| r.id().clone()) {
            if let Err(e) = run.manager.mark_failed(&id) {
                run.warn(format!("could not mark release {} failed: {}", id, e));
            }
        }
    }

    /// The application already restarted on the new release; restart it
    /// again so it serves the restored one
    fn restart_after_restore(&self, run: &mut HostRun<'_>, previous: Option<&ReleaseId>) {
        let (Some(command), Some(_)) = (&self.config.restart_command, previous) else {
            return;
        };
        let cwd = app_root(&self.config.paths().current(), &self.config.app_path);
        if let Err(e) = run.remote.exec(&self.config.try_sudo(command), Some(&cwd)) {
            run.warn(format!("restart after restoring current failed: {}", e));
        }
    }
}

/// `base/app_path`, or `base` itself when no app path is configured
pub fn app_root(base: &Path, app_path: &Path) -> PathBuf {
    if app_path.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(app_path)
    }
}
