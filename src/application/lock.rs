//! Per-host deploy lock
//!
//! Held for the whole of a host's run so two capstan processes never
//! mutate the same deploy root at once.

use std::path::PathBuf;

use crate::domain::entities::DeployPaths;
use crate::domain::ports::{Remote, RemoteResult};

/// Releases the lock when dropped
pub struct DeployLock<'a> {
    remote: &'a dyn Remote,
    path: PathBuf,
}

impl<'a> DeployLock<'a> {
    /// Create the deploy root if needed, then take `.capstan.lock` in it
    pub fn acquire(remote: &'a dyn Remote, paths: &DeployPaths) -> RemoteResult<Self> {
        remote.create_dir_all(paths.root())?;
        let path = paths.lock();
        remote.try_lock(&path, &lock_owner())?;
        tracing::debug!(host = %remote.host(), "lock acquired");
        Ok(Self { remote, path })
    }
}

impl Drop for DeployLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.remote.unlock(&self.path) {
            tracing::warn!(
                host = %self.remote.host(),
                lock = %self.path.display(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}

/// Login name of whoever runs capstan
pub fn local_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `user@machine pid N`, shown to whoever finds the lock held
pub fn lock_owner() -> String {
    let user = local_user();
    let machine = std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}@{} pid {}", user, machine, std::process::id())
}
