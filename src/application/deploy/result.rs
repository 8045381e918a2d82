//! Deploy Result
//!
//! Per-host outcomes and the report aggregating them. Shared by every
//! command that fans out over hosts.

use crate::domain::ports::{DeployEvent, DeployEventSink};
use crate::domain::value_objects::{Host, ReleaseId};
use crate::error::DeployError;

/// What happened on one host
#[derive(Debug)]
pub struct HostOutcome {
    pub host: Host,
    /// Release created (deploy) or made current (rollback)
    pub release: Option<ReleaseId>,
    /// Release that was current before this run
    pub previous: Option<ReleaseId>,
    pub revision: Option<String>,
    /// Releases removed by pruning or rollback
    pub deleted: Vec<ReleaseId>,
    pub warnings: Vec<String>,
    pub error: Option<DeployError>,
}

impl HostOutcome {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            release: None,
            previous: None,
            revision: None,
            deleted: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Record a non-fatal problem and report it to `sink`
    pub(crate) fn warn(&mut self, sink: &dyn DeployEventSink, message: String) {
        tracing::warn!(host = %self.host, "{}", message);
        sink.on_event(DeployEvent::Warning {
            host: self.host.address().to_string(),
            message: message.clone(),
        });
        self.warnings.push(message);
    }
}

/// Aggregated result of a run across hosts
#[derive(Debug, Default)]
pub struct DeployReport {
    pub outcomes: Vec<HostOutcome>,
}

impl DeployReport {
    pub fn new(outcomes: Vec<HostOutcome>) -> Self {
        Self { outcomes }
    }

    /// True only when every host completed
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(HostOutcome::is_success)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Host, &DeployError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (&o.host, e)))
    }

    pub fn outcome(&self, address: &str) -> Option<&HostOutcome> {
        self.outcomes.iter().find(|o| o.host.address() == address)
    }
}
