//! Release Manager
//!
//! Owns the on-disk release layout of one host:
//!
//! ```text
//! deploy_to/
//!   releases/<id>/     one directory per release
//!   shared/            state that outlives releases
//!   current -> releases/<id>
//! ```
//!
//! Release status is never cached; `list()` reads it back from the host
//! every time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    sudo_wrap, DeployPaths, Release, ReleaseStatus, FAILED_MARKER, PENDING_MARKER, REVISION_FILE,
};
use crate::domain::ports::{Remote, RemoteResult, SourceTree};
use crate::domain::value_objects::ReleaseId;

pub struct ReleaseManager<'a> {
    remote: &'a dyn Remote,
    paths: DeployPaths,
    sudo: bool,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(remote: &'a dyn Remote, paths: DeployPaths) -> Self {
        Self {
            remote,
            paths,
            sudo: false,
        }
    }

    /// Delete releases through `sudo -n`
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    pub fn paths(&self) -> &DeployPaths {
        &self.paths
    }

    /// Create `releases/` and `shared/` plus the shared side of every
    /// linked directory and the parent of every linked file
    pub fn setup(&self, linked_dirs: &[PathBuf], linked_files: &[PathBuf]) -> RemoteResult<()> {
        self.remote.create_dir_all(&self.paths.releases())?;
        self.remote.create_dir_all(&self.paths.shared())?;
        for dir in linked_dirs {
            self.remote.create_dir_all(&self.paths.shared().join(dir))?;
        }
        for file in linked_files {
            if let Some(parent) = self.paths.shared().join(file).parent() {
                self.remote.create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// The release `current` points at, if any
    pub fn current(&self) -> RemoteResult<Option<ReleaseId>> {
        let target = self.remote.read_link(&self.paths.current())?;
        Ok(target.as_deref().and_then(release_id_of))
    }

    /// Every release on the host, oldest first
    pub fn list(&self) -> RemoteResult<Vec<Release>> {
        let current = self.current()?;
        let mut ids: Vec<ReleaseId> = self
            .remote
            .list_dir(&self.paths.releases())?
            .iter()
            .filter_map(|name| ReleaseId::parse(name))
            .collect();
        ids.sort();

        Ok(ids
            .into_iter()
            .map(|id| {
                let path = self.paths.release(&id);
                let status = if current.as_ref() == Some(&id) {
                    ReleaseStatus::Active
                } else if self.remote.exists(&path.join(FAILED_MARKER)) {
                    ReleaseStatus::Failed
                } else if self.remote.exists(&path.join(PENDING_MARKER)) {
                    ReleaseStatus::Pending
                } else {
                    ReleaseStatus::Superseded
                };
                Release::new(id, path, status)
            })
            .collect())
    }

    /// Create an empty pending release whose id sorts after every release
    /// already on the host
    pub fn create_release(&self, now: DateTime<Utc>) -> RemoteResult<Release> {
        let existing: Vec<ReleaseId> = self
            .remote
            .list_dir(&self.paths.releases())?
            .iter()
            .filter_map(|name| ReleaseId::parse(name))
            .collect();
        let id = ReleaseId::next(now, &existing);
        let path = self.paths.release(&id);

        self.remote.create_dir_all(&path)?;
        self.remote.write_file(&path.join(PENDING_MARKER), "")?;
        tracing::debug!(host = %self.remote.host(), release = %id, "created release");

        Ok(Release::new(id, path, ReleaseStatus::Pending))
    }

    /// Write `REVISION` and link shared paths into the release. Returns the
    /// linked files that do not exist under `shared/` yet; their links
    /// dangle until someone creates them.
    pub fn finalize(
        &self,
        release: &Release,
        tree: &SourceTree,
        linked_dirs: &[PathBuf],
        linked_files: &[PathBuf],
    ) -> RemoteResult<Vec<PathBuf>> {
        self.remote.write_file(
            &release.path().join(REVISION_FILE),
            &format!("{}\n", tree.revision),
        )?;

        for dir in linked_dirs {
            let shared = self.paths.shared().join(dir);
            self.remote.create_dir_all(&shared)?;
            self.link_into(release, dir, &shared)?;
        }

        let mut missing = Vec::new();
        for file in linked_files {
            let shared = self.paths.shared().join(file);
            if !self.remote.exists(&shared) {
                missing.push(file.clone());
            }
            self.link_into(release, file, &shared)?;
        }
        Ok(missing)
    }

    fn link_into(&self, release: &Release, relative: &Path, shared: &Path) -> RemoteResult<()> {
        let link = release.path().join(relative);
        // Whatever the source tree shipped at this path is replaced
        self.remote.remove_dir_all(&link)?;
        if let Some(parent) = link.parent() {
            self.remote.create_dir_all(parent)?;
        }
        self.remote.symlink(shared, &link)
    }

    /// Point `current` at `release` in one atomic step, then clear its
    /// pending marker
    pub fn promote(&self, release: &ReleaseId) -> RemoteResult<()> {
        let path = self.paths.release(release);
        self.remote.replace_symlink(&path, &self.paths.current())?;
        self.remote.remove_file(&path.join(PENDING_MARKER))?;
        tracing::info!(host = %self.remote.host(), release = %release, "promoted");
        Ok(())
    }

    /// Put `current` back the way it was before a promotion: pointing at
    /// `previous`, or absent when there was none
    pub fn restore(&self, previous: Option<&ReleaseId>) -> RemoteResult<()> {
        match previous {
            Some(id) => self
                .remote
                .replace_symlink(&self.paths.release(id), &self.paths.current()),
            None => self.remote.remove_file(&self.paths.current()),
        }
    }

    pub fn mark_failed(&self, release: &ReleaseId) -> RemoteResult<()> {
        let path = self.paths.release(release);
        self.remote.write_file(&path.join(FAILED_MARKER), "")?;
        self.remote.remove_file(&path.join(PENDING_MARKER))
    }

    pub fn delete(&self, release: &ReleaseId) -> RemoteResult<()> {
        if !self.sudo {
            return self.remote.remove_dir_all(&self.paths.release(release));
        }
        // Release ids are digits only; run from releases/ so a sandboxed
        // remote resolves the path too
        let command = sudo_wrap(&format!("rm -rf {}", release), true);
        self.remote
            .exec(&command, Some(&self.paths.releases()))
            .map(|_| ())
    }
}

fn release_id_of(target: &Path) -> Option<ReleaseId> {
    target
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(ReleaseId::parse)
}
