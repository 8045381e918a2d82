//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `command` - child processes with timeout and cancellation
//! - `remote/` - Remote implementations (ssh, local)
//! - `fetch/` - Source fetchers (remote_cache, copy)
//! - `events/` - Deploy event sinks (console, NDJSON)

pub mod command;
pub mod events;
pub mod fetch;
pub mod remote;

// Re-export for convenience
pub use command::CommandRunner;
pub use events::{ConsoleEventSink, JsonEventSink};
pub use fetch::{fetcher_for, CopyFetcher, CopySource, RemoteCacheFetcher};
pub use remote::{LocalConnector, LocalRemote, SshConnector, SshRemote};
