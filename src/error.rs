//! Error types for Capstan
//!
//! Uses `thiserror` for library errors. Pre-flight errors (`ConfigError`,
//! `UnknownRole`) abort the run before any host is touched; `DeployError`
//! is scoped to a single host and never aborts the others.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::ports::{FetchError, RemoteError};

/// Result type alias for Capstan operations
pub type CapstanResult<T> = Result<T, CapstanError>;

/// Main error type for Capstan operations
#[derive(Error, Debug)]
pub enum CapstanError {
    /// Configuration could not be loaded or validated
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A role was requested that the configuration never declared
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// A host filter named a host that no role contains
    #[error("unknown host '{0}'")]
    UnknownHost(String),

    /// Role/host filters left nothing to deploy to
    #[error("no hosts matched the selected roles")]
    NoHosts,

    /// Several hosts would share one deploy root on this machine
    #[error("transport \"local\" would deploy {0} hosts into the same directory; set CAPSTAN_LOCAL_ROOT to give each host its own")]
    SharedLocalRoot(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed or missing settings. Always fatal, always pre-flight.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read {}: {message}", .file.display())]
    Read { file: PathBuf, message: String },

    #[error("invalid configuration in {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("missing required key '{key}'")]
    MissingKey { key: String },

    #[error("invalid value '{value}' for '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    /// A retention window of zero would delete the active release
    #[error("keep_releases must be at least 1, got {0}")]
    InvalidKeepReleases(i64),

    #[error("malformed repository '{url}': {reason}")]
    MalformedRepository { url: String, reason: String },

    #[error("invalid path for '{key}': {reason}")]
    InvalidPath { key: String, reason: String },

    #[error("role '{role}' has no hosts")]
    EmptyRole { role: String },

    #[error("invalid host '{host}' in role '{role}': {reason}")]
    InvalidHost {
        role: String,
        host: String,
        reason: String,
    },

    #[error("unknown stage '{0}' (expected one of deploy:start, deploy:update_code, deploy:symlink, deploy:restart, deploy:finished)")]
    UnknownStage(String),

    #[error("unknown task '{0}' (available: deploy:cleanup)")]
    UnknownTask(String),

    #[error("invalid hook #{index}: {reason}")]
    InvalidHook { index: usize, reason: String },

    #[error("hook #{index} is scoped to unknown role '{role}'")]
    UnknownHookRole { index: usize, role: String },
}

/// Failure of one host's deploy. Isolated to that host.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("could not acquire deploy lock: {0}")]
    Lock(RemoteError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("write failed: {0}")]
    Write(RemoteError),

    #[error("promotion failed: {0}")]
    Promotion(RemoteError),

    #[error("restart failed: {0}")]
    Restart(RemoteError),

    #[error("hook '{hook}' failed: {source}")]
    Hook {
        hook: String,
        #[source]
        source: RemoteError,
    },

    /// Reported as a warning; never fails a deploy
    #[error("prune failed: {0}")]
    Prune(RemoteError),

    #[error("rollback failed: {0}")]
    Rollback(String),

    /// Ctrl-C arrived between steps
    #[error("interrupted")]
    Interrupted,
}
