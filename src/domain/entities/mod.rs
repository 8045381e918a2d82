//! Domain Entities
//!
//! - `Configuration` - validated deploy settings
//! - `TargetRegistry` - roles and hosts
//! - `Release` - one deployed source tree
//! - `Hook` - work attached to a pipeline stage

mod configuration;
mod hook;
mod release;
mod target_registry;

pub use configuration::{sudo_wrap, Configuration, DeployPaths, SshSettings};
pub use hook::{Hook, HookAction, CLEANUP_TASK};
pub use release::{Release, ReleaseStatus, FAILED_MARKER, PENDING_MARKER, REVISION_FILE};
pub use target_registry::{Role, TargetRegistry, PRIMARY_FLAG};
