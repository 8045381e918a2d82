//! Source fetcher port - materialise a revision into a release directory

use std::path::Path;

use thiserror::Error;

use super::remote::{Remote, RemoteError};

/// What a fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Commit id (or a content label for non-versioned sources)
    pub revision: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("unknown branch '{0}'")]
    UnknownBranch(String),

    /// Building the source on the deploying machine failed
    #[error("{0}")]
    Local(String),
}

/// Strategy for getting source onto a host
///
/// Implementations:
/// - `RemoteCacheFetcher` - persistent clone on the host
/// - `CopyFetcher` - archive built once locally, shipped to each host
pub trait SourceFetcher: Send + Sync {
    /// Fill `release_path` (already created, empty) on the remote host
    fn fetch(&self, remote: &dyn Remote, release_path: &Path) -> Result<SourceTree, FetchError>;

    /// Short description for plans and logs
    fn describe(&self) -> String;
}
