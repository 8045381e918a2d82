//! SSH Remote Implementation
//!
//! Implements the Remote port by running shell commands through the
//! system `ssh` client. Every operation is one ssh invocation.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::entities::SshSettings;
use crate::domain::ports::{Connector, Remote, RemoteError, RemoteResult};
use crate::domain::value_objects::Host;
use crate::infrastructure::command::CommandRunner;

/// ssh exits 255 when the connection itself failed
const SSH_CONNECTION_FAILURE: i32 = 255;
/// Exit code our lock script uses when the lock is already held
const LOCK_HELD: i32 = 75;

/// Remote host reached through `ssh`
pub struct SshRemote {
    host: Host,
    settings: SshSettings,
    runner: CommandRunner,
}

impl SshRemote {
    pub fn new(host: Host, settings: SshSettings, runner: CommandRunner) -> Self {
        Self {
            host,
            settings,
            runner,
        }
    }

    /// Arguments placed before the remote command
    fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.settings.connect_timeout.as_secs()),
        ];
        if let Some(port) = self.host.port().or(self.settings.port) {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.settings.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().into_owned());
        }
        for option in &self.settings.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(self.host.ssh_destination());
        args.push("--".to_string());
        args
    }

    fn run(&self, command: &str, cwd: Option<&Path>, input: Option<&[u8]>) -> RemoteResult<String> {
        let script = match cwd {
            Some(dir) => format!("cd {} && {}", quote_path(dir), command),
            None => command.to_string(),
        };
        tracing::debug!(host = %self.host, command = %script, "ssh exec");

        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args()).arg(&script);

        match self.runner.run(&mut cmd, input) {
            Err(RemoteError::CommandFailed { code, stderr }) if code == SSH_CONNECTION_FAILURE => {
                Err(RemoteError::Connection(stderr))
            }
            other => other,
        }
    }
}

/// Quote a string for safe use in shell commands
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Quote a path for safe use in shell commands
pub fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

impl Remote for SshRemote {
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
        let p = quote_path(path);
        self.run(&format!("test -e {} || test -L {}", p, p), None, None)
            .is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> RemoteResult<()> {
        self.run(&format!("mkdir -p {}", quote_path(path)), None, None)?;
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> RemoteResult<Vec<String>> {
        let p = quote_path(path);
        let out = self.run(&format!("if [ -d {} ]; then ls -1A {}; fi", p, p), None, None)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn write_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
        let p = quote_path(path);
        let tmp = quote(&format!("{}.tmp", path.to_string_lossy()));
        // Write to temp file then atomically rename
        self.run(
            &format!("cat > {} && mv -f {} {}", tmp, tmp, p),
            None,
            Some(content.as_bytes()),
        )?;
        Ok(())
    }

    fn append_file(&self, path: &Path, content: &str) -> RemoteResult<()> {
        self.run(
            &format!("cat >> {}", quote_path(path)),
            None,
            Some(content.as_bytes()),
        )?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> RemoteResult<()> {
        self.run(&format!("rm -f {}", quote_path(path)), None, None)?;
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> RemoteResult<()> {
        self.run(&format!("rm -rf {}", quote_path(path)), None, None)?;
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
        self.run(
            &format!("ln -sfn {} {}", quote_path(target), quote_path(link)),
            None,
            None,
        )?;
        Ok(())
    }

    fn replace_symlink(&self, target: &Path, link: &Path) -> RemoteResult<()> {
        let tmp = quote(&format!("{}.capstan-tmp", link.to_string_lossy()));
        // rename(2) over the old link; `-T` keeps mv from descending into it
        self.run(
            &format!(
                "ln -sfn {} {} && mv -Tf {} {}",
                quote_path(target),
                tmp,
                tmp,
                quote_path(link)
            ),
            None,
            None,
        )?;
        Ok(())
    }

    fn read_link(&self, link: &Path) -> RemoteResult<Option<PathBuf>> {
        let p = quote_path(link);
        let out = self.run(&format!("if [ -L {} ]; then readlink {}; fi", p, p), None, None)?;
        Ok(if out.is_empty() {
            None
        } else {
            Some(PathBuf::from(out))
        })
    }

    fn try_lock(&self, path: &Path, owner: &str) -> RemoteResult<()> {
        // mkdir is atomic: exactly one concurrent caller creates the directory
        let p = quote_path(path);
        let script = format!(
            "if mkdir {p} 2>/dev/null; then printf '%s\\n' {owner} > {p}/owner; \
             else cat {p}/owner >&2 2>/dev/null; exit {code}; fi",
            p = p,
            owner = quote(owner),
            code = LOCK_HELD
        );
        match self.run(&script, None, None) {
            Err(RemoteError::CommandFailed { code, stderr }) if code == LOCK_HELD => {
                Err(RemoteError::Locked {
                    path: path.to_path_buf(),
                    holder: if stderr.is_empty() {
                        "unknown".to_string()
                    } else {
                        stderr
                    },
                })
            }
            other => other.map(|_| ()),
        }
    }

    fn unlock(&self, path: &Path) -> RemoteResult<()> {
        self.run(&format!("rm -rf {}", quote_path(path)), None, None)?;
        Ok(())
    }
}

/// Opens `SshRemote`s, filling in the configured login when a host string
/// does not carry one
pub struct SshConnector {
    settings: SshSettings,
    user: Option<String>,
    runner: CommandRunner,
}

impl SshConnector {
    pub fn new(settings: SshSettings, user: Option<String>, runner: CommandRunner) -> Self {
        Self {
            settings,
            user,
            runner,
        }
    }
}

impl Connector for SshConnector {
    fn connect(&self, host: &Host) -> Box<dyn Remote> {
        let host = host.clone().or_user(self.user.as_deref());
        Box::new(SshRemote::new(
            host,
            self.settings.clone(),
            self.runner.clone(),
        ))
    }
}
