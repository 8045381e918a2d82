//! Remote implementations
//!
//! - `SshRemote` - commands through the system ssh client
//! - `LocalRemote` - this machine, optionally sandboxed

mod local;
mod ssh;

pub use local::{LocalConnector, LocalRemote};
pub use ssh::{quote, quote_path, SshConnector, SshRemote};
