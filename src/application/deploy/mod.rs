//! Deploy Module
//!
//! Orchestrates a release-based deploy across hosts.
//!
//! ## Structure
//!
//! - `options` - Configuration types (`DeployOptions`)
//! - `result` - Result types (`HostOutcome`, `DeployReport`)
//! - `use_case` - Core use case logic (`DeployUseCase`)
//!
//! ## Usage
//!
//! ```ignore
//! use capstan::application::deploy::{DeployOptions, DeployUseCase};
//!
//! let use_case = DeployUseCase::new(&config, connector, fetcher, cancel);
//! let report = use_case.execute(&DeployOptions::new())?;
//! ```

mod options;
mod result;
mod use_case;

pub use options::DeployOptions;
pub use result::{DeployReport, HostOutcome};
pub use use_case::{app_root, DeployUseCase, HostPlan};

#[cfg(test)]
mod tests;
