//! Configuration loading and validation

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::domain::entities::{Configuration, Hook, SshSettings, TargetRegistry, PRIMARY_FLAG};
use crate::domain::services::HookPipeline;
use crate::domain::value_objects::{DeployStrategy, Host, HookSlot, Scm, Transport};
use crate::error::ConfigError;

use super::types::{HookConfig, RawConfig, SshConfig};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "capstan.toml";

const DEFAULT_BRANCH: &str = "master";
const DEFAULT_DEPLOY_TO: &str = "/u/apps/{application}";
const DEFAULT_KEEP_RELEASES: i64 = 5;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

/// Values that take precedence over the file.
///
/// Precedence, highest first: CLI flags, environment (`CAPSTAN_*`), file,
/// derived defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub branch: Option<String>,
    pub user: Option<String>,
    pub keep_releases: Option<i64>,
}

impl ConfigOverrides {
    /// Read `CAPSTAN_BRANCH`, `CAPSTAN_USER` and `CAPSTAN_KEEP_RELEASES`
    pub fn from_env() -> Result<Self, ConfigError> {
        let keep_releases = match non_empty_var("CAPSTAN_KEEP_RELEASES") {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "CAPSTAN_KEEP_RELEASES".to_string(),
                    value: raw.clone(),
                    expected: "an integer".to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            branch: non_empty_var("CAPSTAN_BRANCH"),
            user: non_empty_var("CAPSTAN_USER"),
            keep_releases,
        })
    }

    /// Fill unset values from `lower`
    pub fn or(self, lower: Self) -> Self {
        Self {
            branch: self.branch.or(lower.branch),
            user: self.user.or(lower.user),
            keep_releases: self.keep_releases.or(lower.keep_releases),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(
    path: &Path,
    overrides: &ConfigOverrides,
) -> Result<(Configuration, Vec<ConfigWarning>), ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_with_warnings(&content, path, overrides)
}

/// Parse configuration text. `file` is only used in messages.
pub fn parse_with_warnings(
    content: &str,
    file: &Path,
    overrides: &ConfigOverrides,
) -> Result<(Configuration, Vec<ConfigWarning>), ConfigError> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let raw: RawConfig = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| ConfigError::Parse {
        file: file.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: file.to_path_buf(),
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    let config = build(raw, overrides)?;
    tracing::debug!(
        application = %config.application,
        deploy_to = %config.deploy_to.display(),
        hosts = config.registry.all_hosts().len(),
        "configuration loaded"
    );
    Ok((config, warnings))
}

/// Validate raw settings and derive the immutable `Configuration`
pub fn build(raw: RawConfig, overrides: &ConfigOverrides) -> Result<Configuration, ConfigError> {
    let application = required(raw.application, "application")?;
    if application.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ConfigError::InvalidValue {
            key: "application".to_string(),
            value: application,
            expected: "a name without spaces or '/'".to_string(),
        });
    }

    let domain = match raw.domain.as_deref() {
        Some(d) => interpolate(d, "domain", &[("application", &application)])?,
        None => application.clone(),
    };
    let vars = [
        ("application", application.as_str()),
        ("domain", domain.as_str()),
    ];

    let deploy_to = interpolate(
        raw.deploy_to.as_deref().unwrap_or(DEFAULT_DEPLOY_TO),
        "deploy_to",
        &vars,
    )?;
    let deploy_to = absolute_path("deploy_to", &deploy_to)?;
    let app_path = relative_path("app_path", &raw.app_path)?;

    let scm = match raw.scm.as_deref() {
        None | Some("git") => Scm::Git,
        Some("none") => Scm::None,
        Some(other) => return Err(invalid("scm", other, "\"git\" or \"none\"")),
    };
    let deploy_via = match raw.deploy_via.as_deref() {
        None | Some("remote_cache") => DeployStrategy::RemoteCache,
        Some("copy") => DeployStrategy::Copy,
        Some(other) => return Err(invalid("deploy_via", other, "\"remote_cache\" or \"copy\"")),
    };
    if scm == Scm::None && deploy_via == DeployStrategy::RemoteCache {
        return Err(invalid(
            "deploy_via",
            "remote_cache",
            "\"copy\" when scm = \"none\"",
        ));
    }
    let transport = match raw.transport.as_deref() {
        None | Some("ssh") => Transport::Ssh,
        Some("local") => Transport::Local,
        Some(other) => return Err(invalid("transport", other, "\"ssh\" or \"local\"")),
    };

    let repository = required(raw.repository, "repository")?;
    validate_repository(&repository, scm)?;

    let branch = overrides
        .branch
        .clone()
        .or(raw.branch)
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    if branch.is_empty() || branch.starts_with('-') || branch.chars().any(char::is_whitespace) {
        return Err(invalid("branch", &branch, "a branch name"));
    }

    let user = overrides
        .user
        .clone()
        .or(raw.user)
        .filter(|u| !u.trim().is_empty());

    let keep = overrides
        .keep_releases
        .or(raw.keep_releases)
        .unwrap_or(DEFAULT_KEEP_RELEASES);
    let keep_releases = usize::try_from(keep)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ConfigError::InvalidKeepReleases(keep))?;

    let restart_command = raw.restart_command.filter(|c| !c.trim().is_empty());

    let linked_dirs = linked_paths("linked_dirs", &raw.linked_dirs)?;
    let linked_files = linked_paths("linked_files", &raw.linked_files)?;

    let command_timeout = match raw.command_timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS) {
        0 => return Err(invalid("command_timeout", "0", "a positive number of seconds")),
        secs => Duration::from_secs(secs),
    };

    let ssh = ssh_settings(raw.ssh)?;

    let mut registry = TargetRegistry::new();
    for (name, role) in &raw.roles {
        let mut hosts = Vec::with_capacity(role.hosts.len());
        for spec in &role.hosts {
            let expanded = interpolate(spec, &format!("roles.{}", name), &vars)?;
            let host = Host::parse(&expanded).map_err(|e| ConfigError::InvalidHost {
                role: name.clone(),
                host: spec.clone(),
                reason: e.to_string(),
            })?;
            hosts.push(host);
        }
        let mut flags = role.flags.clone();
        if role.primary {
            flags.push(PRIMARY_FLAG.to_string());
        }
        registry.add_role(name.clone(), hosts, flags)?;
    }
    if registry.all_hosts().is_empty() {
        return Err(ConfigError::MissingKey {
            key: "roles".to_string(),
        });
    }

    let mut pipeline = HookPipeline::new();
    for (i, hook) in raw.hooks.iter().enumerate() {
        register_hook(&mut pipeline, &registry, i + 1, hook)?;
    }

    Ok(Configuration {
        application,
        domain,
        deploy_to,
        app_path,
        repository,
        scm,
        branch,
        deploy_via,
        user,
        use_sudo: raw.use_sudo,
        keep_releases,
        restart_command,
        linked_dirs,
        linked_files,
        transport,
        ssh,
        command_timeout,
        registry,
        pipeline,
    })
}

fn register_hook(
    pipeline: &mut HookPipeline,
    registry: &TargetRegistry,
    index: usize,
    spec: &HookConfig,
) -> Result<(), ConfigError> {
    let bad = |reason: &str| ConfigError::InvalidHook {
        index,
        reason: reason.to_string(),
    };

    let (slot, stage) = match (&spec.before, &spec.after) {
        (Some(stage), None) => (HookSlot::Before, stage),
        (None, Some(stage)) => (HookSlot::After, stage),
        (Some(_), Some(_)) => return Err(bad("sets both 'before' and 'after'")),
        (None, None) => return Err(bad("needs 'before' or 'after'")),
    };

    let hook = match (&spec.task, &spec.run) {
        (Some(task), None) => Hook::task(task)?,
        (None, Some(run)) if run.trim().is_empty() => return Err(bad("'run' is empty")),
        (None, Some(run)) => Hook::command(run.trim()).with_sudo(spec.sudo),
        (Some(_), Some(_)) => return Err(bad("sets both 'task' and 'run'")),
        (None, None) => return Err(bad("needs 'task' or 'run'")),
    };

    for role in &spec.roles {
        if !registry.has_role(role) {
            return Err(ConfigError::UnknownHookRole {
                index,
                role: role.clone(),
            });
        }
    }

    pipeline.register(stage, slot, hook.with_roles(spec.roles.clone()))
}

fn ssh_settings(raw: SshConfig) -> Result<SshSettings, ConfigError> {
    let defaults = SshSettings::default();
    let connect_timeout = match raw.connect_timeout {
        Some(0) => return Err(invalid("ssh.connect_timeout", "0", "a positive number of seconds")),
        Some(secs) => Duration::from_secs(secs),
        None => defaults.connect_timeout,
    };
    Ok(SshSettings {
        port: raw.port,
        identity_file: raw.identity_file.as_deref().map(expand_home),
        options: raw.options,
        connect_timeout,
    })
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

/// Expand `{name}` placeholders from `vars`. Unknown or unclosed
/// placeholders are errors.
fn interpolate(value: &str, key: &str, vars: &[(&str, &str)]) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| invalid(key, value, "a closed '{...}' placeholder"))?;
        let name = &after[..end];
        let replacement = vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| {
                let known: Vec<String> = vars.iter().map(|(n, _)| format!("{{{}}}", n)).collect();
                invalid(key, value, &format!("placeholders {}", known.join(", ")))
            })?;
        out.push_str(replacement);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn absolute_path(key: &str, value: &str) -> Result<PathBuf, ConfigError> {
    let path = Path::new(value);
    let reason = if !path.is_absolute() {
        Some(format!("'{}' must be absolute", value))
    } else if path.components().any(|c| c == Component::ParentDir) {
        Some(format!("'{}' must not contain '..'", value))
    } else if path.parent().is_none() {
        Some("refusing to deploy into '/'".to_string())
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ConfigError::InvalidPath {
            key: key.to_string(),
            reason,
        }),
        None => Ok(path.to_path_buf()),
    }
}

/// A path inside a release. May be empty (the release root itself).
fn relative_path(key: &str, value: &str) -> Result<PathBuf, ConfigError> {
    let path = Path::new(value);
    let reason = if path.has_root() {
        Some(format!("'{}' must be relative to the release", value))
    } else if path.components().any(|c| c == Component::ParentDir) {
        Some(format!("'{}' escapes the release directory", value))
    } else {
        None
    };
    if let Some(reason) = reason {
        return Err(ConfigError::InvalidPath {
            key: key.to_string(),
            reason,
        });
    }
    Ok(path
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect())
}

fn linked_paths(key: &str, values: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut paths = Vec::with_capacity(values.len());
    for value in values {
        let path = relative_path(key, value)?;
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidPath {
                key: key.to_string(),
                reason: format!("'{}' names the release root", value),
            });
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Accepts `scheme://host/path`, scp-style `[user@]host:path`, and local
/// paths. With `scm = "none"` the repository is a local directory and
/// only has to be non-empty.
fn validate_repository(url: &str, scm: Scm) -> Result<(), ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedRepository {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if url.chars().any(char::is_whitespace) {
        return Err(malformed("contains whitespace"));
    }
    if scm == Scm::None {
        return Ok(());
    }

    if let Some((scheme, rest)) = url.split_once("://") {
        return match scheme {
            "file" if rest.starts_with('/') => Ok(()),
            "file" => Err(malformed("file URLs need an absolute path")),
            "ssh" | "git" | "http" | "https" => {
                let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
                let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
                if host.is_empty() || host.starts_with(':') {
                    Err(malformed("missing host"))
                } else if path.is_empty() {
                    Err(malformed("missing repository path"))
                } else {
                    Ok(())
                }
            }
            other => Err(malformed(&format!("unsupported scheme '{}'", other))),
        };
    }

    if url.starts_with('/') || url.starts_with("./") || url.starts_with("../") || url.starts_with('~')
    {
        return Ok(());
    }

    match url.split_once(':') {
        Some((authority, path)) => {
            let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
            if host.is_empty() {
                Err(malformed("missing host before ':'"))
            } else if path.is_empty() {
                Err(malformed("missing path after ':'"))
            } else {
                Ok(())
            }
        }
        None => Err(malformed("expected a URL, [user@]host:path, or a local path")),
    }
}

/// Local cache root: `$CAPSTAN_HOME`, else `~/.capstan`
pub fn cache_dir() -> Option<PathBuf> {
    non_empty_var("CAPSTAN_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".capstan")))
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "application",
        "domain",
        "deploy_to",
        "app_path",
        "repository",
        "scm",
        "branch",
        "deploy_via",
        "user",
        "use_sudo",
        "keep_releases",
        "restart_command",
        "linked_dirs",
        "linked_files",
        "transport",
        "command_timeout",
        "ssh",
        "port",
        "identity_file",
        "options",
        "connect_timeout",
        "roles",
        "hooks",
        "before",
        "after",
        "task",
        "run",
        "sudo",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
