//! Retention Pruner
//!
//! Applies `RetentionPolicy` to a host's releases and deletes what falls
//! outside the window. A release that cannot be deleted is reported and
//! skipped; the next cleanup tries again.

use crate::application::release_manager::ReleaseManager;
use crate::domain::ports::RemoteError;
use crate::domain::services::RetentionPolicy;
use crate::domain::value_objects::ReleaseId;

/// What one prune did
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub deleted: Vec<ReleaseId>,
    pub failed: Vec<(ReleaseId, RemoteError)>,
}

pub struct RetentionPruner<'a> {
    manager: &'a ReleaseManager<'a>,
    policy: RetentionPolicy,
}

impl<'a> RetentionPruner<'a> {
    pub fn new(manager: &'a ReleaseManager<'a>, policy: RetentionPolicy) -> Self {
        Self { manager, policy }
    }

    /// Prune, never touching `in_flight` (the release a running deploy is
    /// still building). Fails only when the releases cannot be listed.
    pub fn prune(&self, in_flight: Option<&ReleaseId>) -> Result<PruneOutcome, RemoteError> {
        let releases: Vec<_> = self
            .manager
            .list()?
            .into_iter()
            .filter(|r| Some(r.id()) != in_flight)
            .collect();
        let plan = self.policy.plan(&releases);

        let mut outcome = PruneOutcome::default();
        for id in plan.delete {
            match self.manager.delete(&id) {
                Ok(()) => {
                    tracing::info!(release = %id, "deleted release");
                    outcome.deleted.push(id);
                }
                Err(e) => {
                    tracing::warn!(release = %id, error = %e, "could not delete release");
                    outcome.failed.push((id, e));
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DeployPaths, ReleaseStatus};
    use crate::domain::ports::{Remote, RemoteResult};
    use crate::domain::value_objects::{CancelFlag, Host};
    use crate::infrastructure::command::CommandRunner;
    use crate::infrastructure::remote::LocalRemote;
    use chrono::{TimeZone, Utc};
    use std::num::NonZeroUsize;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// File operations hit the sandbox; commands are recorded, not run
    struct RecordingRemote {
        inner: LocalRemote,
        commands: Mutex<Vec<(String, Option<PathBuf>)>>,
    }

    impl Remote for RecordingRemote {
        fn host(&self) -> &Host {
            self.inner.host()
        }

        fn exec(&self, command: &str, cwd: Option<&Path>) -> RemoteResult<String> {
            self.commands
                .lock()
                .unwrap()
                .push((command.to_string(), cwd.map(Path::to_path_buf)));
            Ok(String::new())
        }

        fn exec_with_input(
            &self,
            command: &str,
            cwd: Option<&Path>,
            _input: &[u8],
        ) -> RemoteResult<String> {
            self.exec(command, cwd)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn create_dir_all(&self, path: &Path) -> RemoteResult<()> {
            self.inner.create_dir_all(path)
        }

        fn list_dir(&self, path: &Path) -> RemoteResult<Vec<String>> {
            self.inner.list_dir(path)
        }

        fn write_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
            self.inner.write_file(path, content)
        }

        fn append_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
            self.inner.append_file(path, content)
        }

        fn remove_file(&self, path: &Path) -> RemoteResult<()> {
            self.inner.remove_file(path)
        }

        fn remove_dir_all(&self, path: &Path) -> RemoteResult<()> {
            self.inner.remove_dir_all(path)
        }

        fn symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
            self.inner.symlink(target, link)
        }

        fn replace_symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
            self.inner.replace_symlink(target, link)
        }

        fn read_link(&self, link: &Path) -> RemoteResult<Option<PathBuf>> {
            self.inner.read_link(link)
        }

        fn try_lock(&self, path: &Path, owner: &str) -> RemoteResult<()> {
            self.inner.try_lock(path, owner)
        }

        fn unlock(&self, path: &Path) -> RemoteResult<()> {
            self.inner.unlock(path)
        }
    }

    fn keep(n: usize) -> RetentionPolicy {
        RetentionPolicy::new(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn prune_keeps_active_and_newest() {
        let dir = tempdir().unwrap();
        let runner = CommandRunner::new(Duration::from_secs(10), CancelFlag::new());
        let remote = LocalRemote::new(Host::new("web1"), runner).with_root(dir.path());
        let manager = ReleaseManager::new(&remote, DeployPaths::new("/srv/site"));

        let mut ids = Vec::new();
        for sec in 0..4 {
            let release = manager
                .create_release(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap())
                .unwrap();
            manager.promote(release.id()).unwrap();
            ids.push(release.id().clone());
        }

        let outcome = RetentionPruner::new(&manager, keep(3)).prune(None).unwrap();

        assert_eq!(outcome.deleted, vec![ids[0].clone()]);
        assert!(outcome.failed.is_empty());
        let left: Vec<_> = manager.list().unwrap().into_iter().map(|r| r.id().clone()).collect();
        assert_eq!(left, ids[1..].to_vec());
    }

    #[test]
    fn prune_skips_the_in_flight_release() {
        let dir = tempdir().unwrap();
        let runner = CommandRunner::new(Duration::from_secs(10), CancelFlag::new());
        let remote = LocalRemote::new(Host::new("web1"), runner).with_root(dir.path());
        let manager = ReleaseManager::new(&remote, DeployPaths::new("/srv/site"));

        let active = manager
            .create_release(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        manager.promote(active.id()).unwrap();
        let building = manager
            .create_release(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap())
            .unwrap();

        let outcome = RetentionPruner::new(&manager, keep(1))
            .prune(Some(building.id()))
            .unwrap();

        assert!(outcome.deleted.is_empty());
        let statuses: Vec<_> = manager.list().unwrap().iter().map(|r| r.status()).collect();
        assert_eq!(statuses, vec![ReleaseStatus::Active, ReleaseStatus::Pending]);
    }

    #[test]
    fn prune_with_sudo_deletes_through_sudo() {
        let dir = tempdir().unwrap();
        let runner = CommandRunner::new(Duration::from_secs(10), CancelFlag::new());
        let remote = RecordingRemote {
            inner: LocalRemote::new(Host::new("web1"), runner).with_root(dir.path()),
            commands: Mutex::new(Vec::new()),
        };
        let manager = ReleaseManager::new(&remote, DeployPaths::new("/srv/site")).with_sudo(true);

        for sec in 0..3 {
            let release = manager
                .create_release(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap())
                .unwrap();
            manager.promote(release.id()).unwrap();
        }

        let outcome = RetentionPruner::new(&manager, keep(2)).prune(None).unwrap();

        assert_eq!(outcome.deleted.len(), 1);
        let commands = remote.commands.lock().unwrap();
        assert_eq!(
            *commands,
            vec![(
                "sudo -n sh -c 'rm -rf 20240101000000'".to_string(),
                Some(PathBuf::from("/srv/site/releases"))
            )]
        );
    }

    #[test]
    fn prune_without_sudo_runs_no_commands() {
        let dir = tempdir().unwrap();
        let runner = CommandRunner::new(Duration::from_secs(10), CancelFlag::new());
        let remote = RecordingRemote {
            inner: LocalRemote::new(Host::new("web1"), runner).with_root(dir.path()),
            commands: Mutex::new(Vec::new()),
        };
        let manager = ReleaseManager::new(&remote, DeployPaths::new("/srv/site"));

        for sec in 0..3 {
            let release = manager
                .create_release(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap())
                .unwrap();
            manager.promote(release.id()).unwrap();
        }

        let outcome = RetentionPruner::new(&manager, keep(2)).prune(None).unwrap();

        assert_eq!(outcome.deleted.len(), 1);
        assert!(remote.commands.lock().unwrap().is_empty());
        assert!(!dir.path().join("srv/site/releases/20240101000000").exists());
    }
}
