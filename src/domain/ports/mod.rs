//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod deploy_events;
pub mod remote;
pub mod source_fetcher;

pub use deploy_events::{DeployEvent, DeployEventSink, NoopEventSink};
pub use remote::{Connector, Remote, RemoteError, RemoteResult};
pub use source_fetcher::{FetchError, SourceFetcher, SourceTree};
