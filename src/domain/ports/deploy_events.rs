//! Deploy Event Port
//!
//! Provides an observable interface for deploy operations.
//! Enables progress reporting, JSON event streams, and debugging.
//! Events from different hosts interleave; every per-host event names
//! its host.

/// Event emitted during deploy operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    /// A command started against a set of hosts
    RunStarted {
        command: String,
        application: String,
        branch: String,
        hosts: Vec<String>,
    },

    /// Work on one host started
    HostStarted { host: String },

    /// A plan step started
    StepStarted { host: String, step: String },

    /// A plan step had nothing to do
    StepSkipped {
        host: String,
        step: String,
        reason: String,
    },

    /// A pending release directory was created
    ReleaseCreated { host: String, release: String },

    /// `current` now points at `release`
    Promoted {
        host: String,
        release: String,
        previous: Option<String>,
    },

    /// `current` was restored after a post-promotion failure
    RolledBack {
        host: String,
        restored: Option<String>,
    },

    /// A release directory was removed
    ReleaseDeleted { host: String, release: String },

    /// Non-fatal problem (failed prune, unwritable revisions log, ...)
    Warning { host: String, message: String },

    /// Work on one host finished
    HostFinished {
        host: String,
        success: bool,
        error: Option<String>,
    },

    /// All hosts finished
    Completed { succeeded: usize, failed: usize },
}

/// Trait for receiving deploy events
///
/// Implementations can be:
/// - ConsoleEventSink: Progress display in terminal
/// - JsonEventSink: NDJSON event stream for CI
/// - NoopEventSink: Silent operation
pub trait DeployEventSink: Send + Sync {
    /// Handle a deploy event
    fn on_event(&self, event: DeployEvent);

    /// Check if this sink wants per-step events
    ///
    /// Some sinks (like CI) may only want summary events.
    fn wants_detailed_events(&self) -> bool {
        true
    }
}

/// No-op event sink for silent operation
pub struct NoopEventSink;

impl DeployEventSink for NoopEventSink {
    fn on_event(&self, _event: DeployEvent) {
        // Do nothing
    }

    fn wants_detailed_events(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test event sink that records all events
    #[derive(Clone, Default)]
    pub(crate) struct RecordingEventSink {
        events: Arc<Mutex<Vec<DeployEvent>>>,
    }

    impl RecordingEventSink {
        pub(crate) fn events(&self) -> Vec<DeployEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DeployEventSink for RecordingEventSink {
        fn on_event(&self, event: DeployEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn recording_sink_captures_events() {
        let sink = RecordingEventSink::default();

        sink.on_event(DeployEvent::HostStarted {
            host: "web1".to_string(),
        });
        sink.on_event(DeployEvent::ReleaseCreated {
            host: "web1".to_string(),
            release: "20240101000000".to_string(),
        });

        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn noop_sink_wants_no_details() {
        let sink = NoopEventSink;
        assert!(!sink.wants_detailed_events());
    }
}
