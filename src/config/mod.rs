//! Configuration module for Capstan
//!
//! Resolution order:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (CAPSTAN_*)
//! 3. Project config (`capstan.toml`, or the file given with `-c`)
//! 4. Derived defaults (lowest priority)
//!
//! `{application}` and `{domain}` placeholders are expanded in `domain`,
//! `deploy_to` and role host strings.

mod loader;
mod types;

pub use loader::{
    build, cache_dir, load_with_warnings, parse_with_warnings, ConfigOverrides, ConfigWarning,
    DEFAULT_CONFIG_FILE,
};
pub use types::{HookConfig, RawConfig, RoleConfig, SshConfig};
