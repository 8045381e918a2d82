//! Source-control and fetch strategy value objects

use serde::{Deserialize, Serialize};

/// Source-control system the repository is kept in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scm {
    #[default]
    Git,
    /// The repository is a plain local directory
    None,
}

impl std::fmt::Display for Scm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scm::Git => write!(f, "git"),
            Scm::None => write!(f, "none"),
        }
    }
}

/// How source reaches the target host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeployStrategy {
    /// Persistent clone on the host, updated incrementally
    #[default]
    RemoteCache,
    /// Full archive built locally and shipped every time
    Copy,
}

impl std::fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployStrategy::RemoteCache => write!(f, "remote_cache"),
            DeployStrategy::Copy => write!(f, "copy"),
        }
    }
}

/// How remote operations are carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Ssh,
    /// Operate on this machine's filesystem directly
    Local,
}
