//! Remote port - operations on a target host
//!
//! This trait allows the application layer to drive a host without
//! depending on how commands reach it.
//!
//! Implementations:
//! - `SshRemote` - each operation is a command run through `ssh`
//! - `LocalRemote` - this machine, optionally rooted in a sandbox directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::domain::value_objects::Host;

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote operation errors
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The host could not be reached
    #[error("connection failed: {0}")]
    Connection(String),

    /// A command ran and exited non-zero
    #[error("exit code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Cancelled by Ctrl-C
    #[error("interrupted")]
    Interrupted,

    /// Another deploy holds the lock
    #[error("{} is held by {holder}", .path.display())]
    Locked { path: PathBuf, holder: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations on one host. All paths are absolute paths on that host.
pub trait Remote: Send + Sync {
    /// The host this remote operates on
    fn host(&self) -> &Host;

    /// Run a shell command, optionally from `cwd`, returning trimmed stdout
    fn exec(&self, command: &str, cwd: Option<&Path>) -> RemoteResult<String>;

    /// Run a shell command with `input` on its stdin
    fn exec_with_input(&self, command: &str, cwd: Option<&Path>, input: &[u8])
        -> RemoteResult<String>;

    /// Check if a path exists (a dangling symlink counts)
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and parents
    fn create_dir_all(&self, path: &Path) -> RemoteResult<()>;

    /// Names of the entries in a directory; a missing directory is empty
    fn list_dir(&self, path: &Path) -> RemoteResult<Vec<String>>;

    /// Write content to a file atomically
    fn write_file(&self, path: &Path, content: &str) -> RemoteResult<()>;

    /// Append content to a file, creating it when missing
    fn append_file(&self, path: &Path, content: &str) -> RemoteResult<()>;

    /// Remove a file; missing files are not an error
    fn remove_file(&self, path: &Path) -> RemoteResult<()>;

    /// Remove a directory tree (or a single file or link); missing paths
    /// are not an error
    fn remove_dir_all(&self, path: &Path) -> RemoteResult<()>;

    /// Create (or replace) a symlink at `link` pointing at `target`
    fn symlink(&self, target: &Path, link: &Path) -> RemoteResult<()>;

    /// Atomically repoint `link` at `target`. Readers of `link` see either
    /// the old target or the new one, never a missing link.
    fn replace_symlink(&self, target: &Path, link: &Path) -> RemoteResult<()>;

    /// Target of a symlink, or `None` when `link` does not exist
    fn read_link(&self, link: &Path) -> RemoteResult<Option<PathBuf>>;

    /// Take an exclusive lock at `path`, failing with `Locked` if held
    fn try_lock(&self, path: &Path, owner: &str) -> RemoteResult<()>;

    /// Release a lock taken with `try_lock`
    fn unlock(&self, path: &Path) -> RemoteResult<()>;
}

/// Opens a `Remote` for a host
pub trait Connector: Send + Sync {
    fn connect(&self, host: &Host) -> Box<dyn Remote>;
}
