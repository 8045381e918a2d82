//! Deploy Options

use chrono::{DateTime, Utc};

use crate::application::targets::TargetFilter;

/// Options for the deploy use case
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Which hosts to deploy to
    pub targets: TargetFilter,
    /// Time the release id is derived from (defaults to now)
    pub release_time: Option<DateTime<Utc>>,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(mut self, targets: TargetFilter) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_release_time(mut self, at: DateTime<Utc>) -> Self {
        self.release_time = Some(at);
        self
    }
}
