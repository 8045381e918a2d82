//! Source fetcher implementations

mod copy;
mod remote_cache;

use std::path::{Path, PathBuf};

pub use copy::{CopyFetcher, CopySource};
pub use remote_cache::RemoteCacheFetcher;

use crate::domain::entities::Configuration;
use crate::domain::ports::SourceFetcher;
use crate::domain::value_objects::{DeployStrategy, Scm};
use crate::infrastructure::command::CommandRunner;

/// Pick the fetcher for a configuration.
///
/// `base_dir` resolves a relative local repository for `copy`;
/// `cache_dir` holds local checkouts for `copy` from git.
pub fn fetcher_for(
    config: &Configuration,
    runner: CommandRunner,
    base_dir: &Path,
    cache_dir: &Path,
) -> Box<dyn SourceFetcher> {
    match (config.deploy_via, config.scm) {
        (DeployStrategy::RemoteCache, _) => Box::new(RemoteCacheFetcher::new(
            config.repository.clone(),
            config.branch.clone(),
            config.paths(),
        )),
        (DeployStrategy::Copy, Scm::Git) => Box::new(CopyFetcher::new(
            CopySource::Git {
                repository: local_repository(base_dir, &config.repository),
                branch: config.branch.clone(),
                checkout: cache_dir.join("cache").join(&config.application),
            },
            runner,
        )),
        (DeployStrategy::Copy, Scm::None) => Box::new(CopyFetcher::new(
            CopySource::Directory(base_dir.join(&config.repository)),
            runner,
        )),
    }
}

/// A `./` or `../` git repository is relative to `base_dir`. The result is
/// absolute since git also runs from inside the checkout.
fn local_repository(base_dir: &Path, repository: &str) -> String {
    if !(repository.starts_with("./") || repository.starts_with("../")) {
        return repository.to_string();
    }
    let joined = base_dir.join(repository);
    std::path::absolute(&joined)
        .unwrap_or(joined)
        .to_string_lossy()
        .into_owned()
}

/// `path` relative to `root` for use in commands run from `root`; paths
/// outside `root` stay absolute
pub(crate) fn relative_to(root: &Path, path: &Path) -> String {
    let rel: PathBuf = match path.strip_prefix(root) {
        Ok(rest) if !rest.as_os_str().is_empty() => rest.to_path_buf(),
        Ok(_) => PathBuf::from("."),
        Err(_) => path.to_path_buf(),
    };
    rel.to_string_lossy().into_owned()
}
