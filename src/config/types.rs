//! Configuration file schema (`capstan.toml`)
//!
//! These structs mirror the file as written. Nothing here is validated;
//! the loader turns a `RawConfig` into a domain `Configuration`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level file contents
///
/// Enumerated settings (`scm`, `deploy_via`, `transport`) are kept as
/// strings so a bad value is reported against its key instead of as a
/// generic parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub application: Option<String>,
    pub domain: Option<String>,
    pub deploy_to: Option<String>,
    #[serde(default)]
    pub app_path: String,

    pub repository: Option<String>,
    pub scm: Option<String>,
    pub branch: Option<String>,
    pub deploy_via: Option<String>,

    pub user: Option<String>,
    #[serde(default)]
    pub use_sudo: bool,
    pub keep_releases: Option<i64>,

    pub restart_command: Option<String>,
    #[serde(default)]
    pub linked_dirs: Vec<String>,
    #[serde(default)]
    pub linked_files: Vec<String>,

    pub transport: Option<String>,
    /// Seconds
    pub command_timeout: Option<u64>,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,

    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

/// `[ssh]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SshConfig {
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    /// Seconds
    pub connect_timeout: Option<u64>,
}

/// One entry under `[roles]`.
///
/// Supports the short forms:
///   web = "example.com"
///   web = ["a.example.com", "b.example.com"]
///
/// And the table form carrying flags:
///   db = { hosts = ["example.com"], primary = true, flags = ["no_release"] }
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleConfig {
    pub hosts: Vec<String>,
    pub primary: bool,
    pub flags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleConfigDe {
    Single(String),
    List(Vec<String>),
    Table {
        #[serde(default)]
        hosts: Vec<String>,
        #[serde(default)]
        primary: bool,
        #[serde(default)]
        flags: Vec<String>,
    },
}

impl<'de> Deserialize<'de> for RoleConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RoleConfigDe::deserialize(deserializer)? {
            RoleConfigDe::Single(host) => Ok(Self {
                hosts: vec![host],
                ..Self::default()
            }),
            RoleConfigDe::List(hosts) => Ok(Self {
                hosts,
                ..Self::default()
            }),
            RoleConfigDe::Table {
                hosts,
                primary,
                flags,
            } => Ok(Self {
                hosts,
                primary,
                flags,
            }),
        }
    }
}

/// One `[[hooks]]` entry
///
/// Exactly one of `before`/`after` and exactly one of `task`/`run` must be
/// set; the loader enforces that.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookConfig {
    pub before: Option<String>,
    pub after: Option<String>,
    pub task: Option<String>,
    pub run: Option<String>,
    #[serde(default)]
    pub sudo: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}
