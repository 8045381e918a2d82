//! `remote_cache` strategy
//!
//! Keeps a persistent clone at `shared/cached-copy` on every host. A
//! deploy fetches into it, hard-resets it to `origin/<branch>`, then copies
//! the tree into the new release. Only the fetch touches the network.

use std::path::Path;

use crate::domain::entities::DeployPaths;
use crate::domain::ports::{FetchError, Remote, RemoteError, SourceFetcher, SourceTree};
use crate::infrastructure::remote::quote;

use super::relative_to;

/// Exit code of the update script when the branch does not exist upstream
const UNKNOWN_BRANCH: i32 = 66;

pub struct RemoteCacheFetcher {
    repository: String,
    branch: String,
    paths: DeployPaths,
}

impl RemoteCacheFetcher {
    pub fn new(repository: impl Into<String>, branch: impl Into<String>, paths: DeployPaths) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
            paths,
        }
    }

    /// Shell script run from the deploy root. Prints the checked-out commit
    /// on its last line.
    fn update_script(&self, release: &Path) -> String {
        let cache = quote(&relative_to(self.paths.root(), &self.paths.repo_cache()));
        let release = quote(&relative_to(self.paths.root(), release));
        let repo = quote(&self.repository);
        let branch = quote(&self.branch);
        let remote_branch = quote(&format!("refs/remotes/origin/{}", self.branch));
        let reset_to = quote(&format!("origin/{}", self.branch));

        format!(
            "set -e\n\
             if [ -d {cache}/.git ]; then\n\
             \x20 git -C {cache} remote set-url origin {repo}\n\
             \x20 git -C {cache} fetch -q --prune origin\n\
             else\n\
             \x20 rm -rf {cache}\n\
             \x20 git clone -q --no-checkout {repo} {cache}\n\
             fi\n\
             if ! git -C {cache} rev-parse --verify -q {remote_branch} >/dev/null; then\n\
             \x20 echo \"unknown branch \"{branch} >&2\n\
             \x20 exit {unknown}\n\
             fi\n\
             git -C {cache} reset -q --hard {reset_to}\n\
             git -C {cache} clean -q -d -x -f\n\
             cp -RPp {cache}/. {release}/\n\
             rm -rf {release}/.git\n\
             git -C {cache} rev-parse HEAD\n",
            cache = cache,
            release = release,
            repo = repo,
            branch = branch,
            remote_branch = remote_branch,
            reset_to = reset_to,
            unknown = UNKNOWN_BRANCH,
        )
    }
}

impl SourceFetcher for RemoteCacheFetcher {
    fn fetch(&self, remote: &dyn Remote, release_path: &Path) -> Result<SourceTree, FetchError> {
        tracing::info!(host = %remote.host(), branch = %self.branch, "updating remote cache");
        let script = self.update_script(release_path);

        let out = match remote.exec(&script, Some(self.paths.root())) {
            Ok(out) => out,
            Err(RemoteError::CommandFailed { code, .. }) if code == UNKNOWN_BRANCH => {
                return Err(FetchError::UnknownBranch(self.branch.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let revision = out.lines().last().unwrap_or_default().trim().to_string();
        Ok(SourceTree { revision })
    }

    fn describe(&self) -> String {
        format!("remote_cache {} ({})", self.repository, self.branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{CancelFlag, Host};
    use crate::infrastructure::command::CommandRunner;
    use crate::infrastructure::remote::LocalRemote;
    use std::fs;
    use std::path::PathBuf;
    use std::process::Command;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn git(dir: &Path, args: &[&str]) -> String {
        let out = Command::new("git")
            .args(["-c", "user.name=Capstan", "-c", "user.email=capstan@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(out.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    /// Upstream repository with one commit on `develop`
    fn upstream() -> TempDir {
        let repo = tempdir().unwrap();
        git(repo.path(), &["init", "-q"]);
        git(repo.path(), &["checkout", "-q", "-b", "develop"]);
        fs::write(repo.path().join("index.html"), "<h1>v1</h1>").unwrap();
        git(repo.path(), &["add", "."]);
        git(repo.path(), &["commit", "-q", "-m", "v1"]);
        repo
    }

    fn host(root: &Path) -> LocalRemote {
        let runner = CommandRunner::new(Duration::from_secs(30), CancelFlag::new());
        LocalRemote::new(Host::new("web1"), runner).with_root(root)
    }

    fn new_release(remote: &LocalRemote, id: &str) -> PathBuf {
        let release = Path::new("/srv/site/releases").join(id);
        remote.create_dir_all(&release).unwrap();
        remote.create_dir_all(Path::new("/srv/site/shared")).unwrap();
        release
    }

    #[test]
    fn fetch_clones_into_cache_and_copies_release() {
        let repo = upstream();
        let host_root = tempdir().unwrap();
        let remote = host(host_root.path());
        let fetcher = RemoteCacheFetcher::new(
            repo.path().to_string_lossy(),
            "develop",
            DeployPaths::new("/srv/site"),
        );

        let release = new_release(&remote, "20240101000000");
        let tree = fetcher.fetch(&remote, &release).unwrap();

        let on_disk = host_root.path().join("srv/site/releases/20240101000000");
        assert_eq!(tree.revision, git(repo.path(), &["rev-parse", "HEAD"]));
        assert_eq!(fs::read_to_string(on_disk.join("index.html")).unwrap(), "<h1>v1</h1>");
        assert!(!on_disk.join(".git").exists());
        assert!(host_root.path().join("srv/site/shared/cached-copy/.git").is_dir());
    }

    #[test]
    fn second_fetch_reuses_the_cache() {
        let repo = upstream();
        let host_root = tempdir().unwrap();
        let remote = host(host_root.path());
        let fetcher = RemoteCacheFetcher::new(
            repo.path().to_string_lossy(),
            "develop",
            DeployPaths::new("/srv/site"),
        );
        let first = new_release(&remote, "20240101000000");
        fetcher.fetch(&remote, &first).unwrap();

        let marker = host_root.path().join("srv/site/shared/cached-copy/.git/kept");
        fs::write(&marker, "").unwrap();
        fs::write(repo.path().join("index.html"), "<h1>v2</h1>").unwrap();
        git(repo.path(), &["commit", "-q", "-am", "v2"]);

        let second = new_release(&remote, "20240101000001");
        let tree = fetcher.fetch(&remote, &second).unwrap();

        let on_disk = host_root.path().join("srv/site/releases/20240101000001");
        assert_eq!(tree.revision, git(repo.path(), &["rev-parse", "HEAD"]));
        assert_eq!(fs::read_to_string(on_disk.join("index.html")).unwrap(), "<h1>v2</h1>");
        assert!(marker.exists());
    }

    #[test]
    fn fetch_of_missing_branch_is_unknown_branch() {
        let repo = upstream();
        let host_root = tempdir().unwrap();
        let remote = host(host_root.path());
        let fetcher = RemoteCacheFetcher::new(
            repo.path().to_string_lossy(),
            "nope",
            DeployPaths::new("/srv/site"),
        );

        let release = new_release(&remote, "20240101000000");
        let err = fetcher.fetch(&remote, &release).unwrap_err();

        assert!(matches!(err, FetchError::UnknownBranch(ref b) if b == "nope"), "{err:?}");
    }

    fn fetcher() -> RemoteCacheFetcher {
        RemoteCacheFetcher::new(
            "git@example.com:acme/site.git",
            "main",
            DeployPaths::new("/srv/site"),
        )
    }

    #[test]
    fn script_uses_paths_relative_to_deploy_root() {
        let script = fetcher().update_script(Path::new("/srv/site/releases/20240101000000"));
        assert!(script.contains("git clone -q --no-checkout 'git@example.com:acme/site.git' 'shared/cached-copy'"));
        assert!(script.contains("cp -RPp 'shared/cached-copy'/. 'releases/20240101000000'/"));
        assert!(script.contains("reset -q --hard 'origin/main'"));
        assert!(!script.contains("/srv/site"));
    }

    #[test]
    fn describe_names_repository_and_branch() {
        assert_eq!(
            fetcher().describe(),
            "remote_cache git@example.com:acme/site.git (main)"
        );
    }
}
