//! `copy` strategy
//!
//! Builds one gzip'd tar archive on the deploying machine and streams it
//! to every host, where it is unpacked into the release. The archive is
//! built lazily on the first fetch and shared by all hosts of the run.
//!
//! Sources:
//! - git: a local checkout under the capstan cache directory, updated in
//!   place and guarded by an exclusive file lock so concurrent capstan
//!   processes never clobber it
//! - a plain local directory (`scm = "none"`)

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use fs2::FileExt;
use sha2::{Digest, Sha256};

use crate::domain::ports::{FetchError, Remote, SourceFetcher, SourceTree};
use crate::infrastructure::command::CommandRunner;

/// Where the archive is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySource {
    Git {
        repository: String,
        branch: String,
        /// Local checkout reused across runs
        checkout: PathBuf,
    },
    Directory(PathBuf),
}

struct Archive {
    bytes: Vec<u8>,
    revision: String,
}

#[derive(Debug, Clone)]
enum BuildError {
    UnknownBranch(String),
    Failed(String),
}

impl From<BuildError> for FetchError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::UnknownBranch(branch) => FetchError::UnknownBranch(branch),
            BuildError::Failed(message) => FetchError::Local(message),
        }
    }
}

pub struct CopyFetcher {
    source: CopySource,
    runner: CommandRunner,
    archive: OnceLock<Result<Archive, BuildError>>,
}

impl CopyFetcher {
    pub fn new(source: CopySource, runner: CommandRunner) -> Self {
        Self {
            source,
            runner,
            archive: OnceLock::new(),
        }
    }

    fn archive(&self) -> Result<&Archive, FetchError> {
        self.archive
            .get_or_init(|| self.build())
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    fn build(&self) -> Result<Archive, BuildError> {
        match &self.source {
            CopySource::Git {
                repository,
                branch,
                checkout,
            } => self.build_from_git(repository, branch, checkout),
            CopySource::Directory(dir) => self.build_from_directory(dir),
        }
    }

    fn build_from_git(
        &self,
        repository: &str,
        branch: &str,
        checkout: &Path,
    ) -> Result<Archive, BuildError> {
        let parent = checkout
            .parent()
            .ok_or_else(|| BuildError::Failed(format!("{} has no parent", checkout.display())))?;
        fs::create_dir_all(parent).map_err(|e| failed("create cache directory", e))?;

        let lock_path = PathBuf::from(format!("{}.lock", checkout.display()));
        let lock_file = File::create(&lock_path)
            .map_err(|e| failed("open cache lock", e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| failed("lock cache", e))?;

        let result = self.update_checkout(repository, branch, checkout).and_then(|revision| {
            let bytes = self.tar(checkout)?;
            Ok(Archive { bytes, revision })
        });

        let _ = FileExt::unlock(&lock_file);
        result
    }

    fn update_checkout(&self, repository: &str, branch: &str, checkout: &Path) -> Result<String, BuildError> {
        if checkout.join(".git").is_dir() {
            tracing::info!(checkout = %checkout.display(), "updating local cache");
            self.git(checkout, &["remote", "set-url", "origin", repository])?;
            self.git(checkout, &["fetch", "-q", "--prune", "origin"])?;
        } else {
            tracing::info!(repository, checkout = %checkout.display(), "cloning local cache");
            if checkout.exists() {
                fs::remove_dir_all(checkout).map_err(|e| failed("clear stale cache", e))?;
            }
            let mut cmd = Command::new("git");
            cmd.args(["clone", "-q", "--no-checkout", repository])
                .arg(checkout);
            self.runner
                .run(&mut cmd, None)
                .map_err(|e| failed("git clone", e))?;
        }

        let remote_branch = format!("refs/remotes/origin/{}", branch);
        if self
            .git(checkout, &["rev-parse", "--verify", "-q", &remote_branch])
            .is_err()
        {
            return Err(BuildError::UnknownBranch(branch.to_string()));
        }

        self.git(checkout, &["reset", "-q", "--hard", &format!("origin/{}", branch)])?;
        self.git(checkout, &["clean", "-q", "-d", "-x", "-f"])?;
        self.git(checkout, &["rev-parse", "HEAD"])
    }

    fn build_from_directory(&self, dir: &Path) -> Result<Archive, BuildError> {
        if !dir.is_dir() {
            return Err(BuildError::Failed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let bytes = self.tar(dir)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = format!("{:x}", hasher.finalize());
        let revision = format!("dir-{}", &digest[..12]);

        Ok(Archive { bytes, revision })
    }

    fn git(&self, checkout: &Path, args: &[&str]) -> Result<String, BuildError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(checkout).args(args);
        self.runner
            .run(&mut cmd, None)
            .map_err(|e| failed(&format!("git {}", args.first().unwrap_or(&"")), e))
    }

    fn tar(&self, dir: &Path) -> Result<Vec<u8>, BuildError> {
        let mut cmd = Command::new("tar");
        cmd.args(["-czf", "-", "--exclude=.git", "-C"])
            .arg(dir)
            .arg(".");
        self.runner
            .run_bytes(&mut cmd, None)
            .map_err(|e| failed("build archive", e))
    }
}

fn failed(what: &str, err: impl std::fmt::Display) -> BuildError {
    BuildError::Failed(format!("{} failed: {}", what, err))
}

impl SourceFetcher for CopyFetcher {
    fn fetch(&self, remote: &dyn Remote, release_path: &Path) -> Result<SourceTree, FetchError> {
        let archive = self.archive()?;
        tracing::info!(
            host = %remote.host(),
            bytes = archive.bytes.len(),
            "uploading archive"
        );
        remote
            .exec_with_input("tar -xzf -", Some(release_path), &archive.bytes)?;
        Ok(SourceTree {
            revision: archive.revision.clone(),
        })
    }

    fn describe(&self) -> String {
        match &self.source {
            CopySource::Git {
                repository, branch, ..
            } => format!("copy {} ({})", repository, branch),
            CopySource::Directory(dir) => format!("copy {}", dir.display()),
        }
    }
}
