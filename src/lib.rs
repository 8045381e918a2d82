//! Capstan - release-based remote deployment orchestrator
//!
//! Capstan deploys an application to a fleet of hosts grouped by role.
//! Every deploy lands in its own timestamped release directory, a `current`
//! symlink is switched atomically once the release is complete, and old
//! releases are pruned to a retention window. Hooks attach custom commands
//! before or after each pipeline stage.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-exports for convenience
pub use application::{DeployOptions, DeployReport, DeployUseCase, TargetFilter};
pub use config::{load_with_warnings, ConfigOverrides, ConfigWarning};
pub use domain::entities::Configuration;
pub use error::{CapstanError, CapstanResult, ConfigError, DeployError};
