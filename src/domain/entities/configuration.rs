//! Configuration entity - the validated, immutable deploy settings
//!
//! Built once by the config loader and passed by reference to every
//! component. Nothing reads settings from anywhere else.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::services::HookPipeline;
use crate::domain::value_objects::{DeployStrategy, ReleaseId, Scm, Transport};

use super::TargetRegistry;

/// Options passed to the ssh client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    pub options: Vec<String>,
    pub connect_timeout: Duration,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: None,
            identity_file: None,
            options: Vec::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub application: String,
    pub domain: String,
    pub deploy_to: PathBuf,
    /// Relative path inside a release treated as the application root
    pub app_path: PathBuf,
    pub repository: String,
    pub scm: Scm,
    pub branch: String,
    pub deploy_via: DeployStrategy,
    pub user: Option<String>,
    pub use_sudo: bool,
    pub keep_releases: NonZeroUsize,
    pub restart_command: Option<String>,
    pub linked_dirs: Vec<PathBuf>,
    pub linked_files: Vec<PathBuf>,
    pub transport: Transport,
    pub ssh: SshSettings,
    pub command_timeout: Duration,
    pub registry: TargetRegistry,
    pub pipeline: HookPipeline,
}

impl Configuration {
    pub fn paths(&self) -> DeployPaths {
        DeployPaths::new(&self.deploy_to)
    }

    /// Prefix `command` with sudo when the configuration asks for it
    pub fn try_sudo(&self, command: &str) -> String {
        sudo_wrap(command, self.use_sudo)
    }
}

pub fn sudo_wrap(command: &str, sudo: bool) -> String {
    if sudo {
        format!("sudo -n sh -c '{}'", command.replace('\'', "'\\''"))
    } else {
        command.to_string()
    }
}

/// Layout of the deploy root on a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPaths {
    root: PathBuf,
}

impl DeployPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn releases(&self) -> PathBuf {
        self.root.join("releases")
    }

    pub fn release(&self, id: &ReleaseId) -> PathBuf {
        self.releases().join(id.as_str())
    }

    pub fn shared(&self) -> PathBuf {
        self.root.join("shared")
    }

    pub fn current(&self) -> PathBuf {
        self.root.join("current")
    }

    /// Persistent clone used by the remote_cache strategy
    pub fn repo_cache(&self) -> PathBuf {
        self.shared().join("cached-copy")
    }

    pub fn lock(&self) -> PathBuf {
        self.root.join(".capstan.lock")
    }

    pub fn revisions_log(&self) -> PathBuf {
        self.root.join("revisions.log")
    }
}
