//! Local Remote Implementation
//!
//! Implements the Remote port on this machine. File operations use
//! `std::fs` directly; commands run through `sh -c`.
//!
//! A `LocalRemote` may be rooted in a sandbox directory: every host path
//! `/a/b` then lives at `<root>/a/b`. Several sandboxed remotes on one
//! machine behave like separate hosts.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use fs2::FileExt;

use crate::domain::ports::{Connector, Remote, RemoteError, RemoteResult};
use crate::domain::value_objects::Host;
use crate::infrastructure::command::CommandRunner;

pub struct LocalRemote {
    host: Host,
    root: Option<PathBuf>,
    runner: CommandRunner,
    locks: Mutex<HashMap<PathBuf, File>>,
}

impl LocalRemote {
    pub fn new(host: Host, runner: CommandRunner) -> Self {
        Self {
            host,
            root: None,
            runner,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Map every host path under `root`
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Host path → path on this machine
    fn map(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => {
                let relative: PathBuf = path
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect();
                root.join(relative)
            }
            None => path.to_path_buf(),
        }
    }

    /// Path on this machine → host path
    fn unmap(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => match path.strip_prefix(root) {
                Ok(rest) => Path::new("/").join(rest),
                Err(_) => path.to_path_buf(),
            },
            None => path.to_path_buf(),
        }
    }

    fn run(&self, command: &str, cwd: Option<&Path>, input: Option<&[u8]>) -> RemoteResult<String> {
        tracing::debug!(host = %self.host, command, "local exec");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = cwd {
            cmd.current_dir(self.map(dir));
        }
        self.runner.run(&mut cmd, input)
    }
}

impl Remote for LocalRemote {
    fn host(&self) -> &Host {
        &self.host
    }

    fn exec(&self, command: &str, cwd: Option<&Path>) -> RemoteResult<String> {
        self.run(command, cwd, None)
    }

    fn exec_with_input(
        &self,
        command: &str,
        cwd: Option<&Path>,
        input: &[u8],
    ) -> RemoteResult<String> {
        self.run(command, cwd, Some(input))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(self.map(path)).is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> RemoteResult<()> {
        fs::create_dir_all(self.map(path))?;
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> RemoteResult<Vec<String>> {
        let dir = self.map(path);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn write_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
        let path = self.map(path);
        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(parent)?;

        // Write to temp file then atomically rename
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| RemoteError::Io(e.error))?;
        Ok(())
    }

    fn append_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.map(path))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> RemoteResult<()> {
        match fs::remove_file(self.map(path)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> RemoteResult<()> {
        let path = self.map(path);
        let result = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            // Files and symlinks go the way `rm -rf` would take them
            Ok(_) => fs::remove_file(&path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
        let link = self.map(link);
        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link)?;
        }
        std::os::unix::fs::symlink(self.map(target), &link)?;
        Ok(())
    }

    fn replace_symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
        let link = self.map(link);
        let mut tmp = link.clone().into_os_string();
        tmp.push(".capstan-tmp");
        let tmp = PathBuf::from(tmp);

        if fs::symlink_metadata(&tmp).is_ok() {
            fs::remove_file(&tmp)?;
        }
        std::os::unix::fs::symlink(self.map(target), &tmp)?;
        // rename(2) replaces the old link in one step
        fs::rename(&tmp, &link)?;
        Ok(())
    }

    fn read_link(&self, link: &Path) -> RemoteResult<Option<PathBuf>> {
        match fs::read_link(self.map(link)) {
            Ok(target) => Ok(Some(self.unmap(&target))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn try_lock(&self, path: &Path, owner: &str) -> RemoteResult<()> {
        let lock_path = self.map(path);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if file.try_lock_exclusive().is_err() {
            let mut holder = String::new();
            let _ = file.read_to_string(&mut holder);
            let holder = holder.trim();
            return Err(RemoteError::Locked {
                path: path.to_path_buf(),
                holder: if holder.is_empty() {
                    "unknown".to_string()
                } else {
                    holder.to_string()
                },
            });
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", owner)?;

        let mut locks = self
            .locks
            .lock()
            .map_err(|_| std::io::Error::other("lock table poisoned"))?;
        locks.insert(path.to_path_buf(), file);
        Ok(())
    }

    fn unlock(&self, path: &Path) -> RemoteResult<()> {
        let file = self
            .locks
            .lock()
            .map_err(|_| std::io::Error::other("lock table poisoned"))?
            .remove(path);
        if let Some(file) = file {
            file.set_len(0)?;
            FileExt::unlock(&file)?;
        }
        Ok(())
    }
}

/// Opens `LocalRemote`s. With a sandbox root, each host gets its own
/// directory `<root>/<address>`.
pub struct LocalConnector {
    root: Option<PathBuf>,
    runner: CommandRunner,
}

impl LocalConnector {
    pub fn new(root: Option<PathBuf>, runner: CommandRunner) -> Self {
        Self { root, runner }
    }
}

impl Connector for LocalConnector {
    fn connect(&self, host: &Host) -> Box<dyn Remote> {
        let remote = LocalRemote::new(host.clone(), self.runner.clone());
        match &self.root {
            Some(root) => Box::new(remote.with_root(root.join(host.address()))),
            None => Box::new(remote),
        }
    }
}
