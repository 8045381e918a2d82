//! Application Layer
//!
//! Use cases that orchestrate the business flow.
//! This layer:
//! - Depends on Domain layer (entities, services, ports)
//! - Does NOT contain business rules (those are in Domain)
//! - Coordinates between Infrastructure and Domain
//!
//! ## Use Cases
//!
//! - `DeployUseCase` - Full pipeline on every selected host
//! - `RollbackUseCase` - Repoint `current` at the previous release
//! - `MaintenanceUseCase` - `setup`, `cleanup` and `releases`
//!
//! ## Services
//!
//! - `ReleaseManager` - release directories and the `current` pointer
//! - `RetentionPruner` - deletes releases outside the retention window

pub mod deploy;
mod fanout;
mod lock;
pub mod maintenance;
pub mod pruner;
pub mod release_manager;
pub mod rollback;
pub mod targets;

pub use deploy::{app_root, DeployOptions, DeployReport, DeployUseCase, HostOutcome, HostPlan};
pub use fanout::for_each_host;
pub use lock::{lock_owner, DeployLock};
pub use maintenance::{HostReleases, MaintenanceUseCase};
pub use pruner::{PruneOutcome, RetentionPruner};
pub use release_manager::ReleaseManager;
pub use rollback::RollbackUseCase;
pub use targets::{select_hosts, TargetFilter};
