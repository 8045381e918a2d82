//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod cancel;
mod host;
mod release_id;
mod stage;
mod strategy;

pub use cancel::CancelFlag;
pub use host::{Host, HostParseError};
pub use release_id::ReleaseId;
pub use stage::{HookSlot, Stage};
pub use strategy::{DeployStrategy, Scm, Transport};
