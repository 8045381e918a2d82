//! Release entity - one immutable deployment of a source tree on a host
//!
//! Status lives on disk: `current` names the active release, marker files
//! inside the release directory name pending and failed ones, anything
//! else is superseded.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::ReleaseId;

/// Marker present while a release is being built
pub const PENDING_MARKER: &str = ".capstan-pending";
/// Marker left behind when a release failed before completing
pub const FAILED_MARKER: &str = ".capstan-failed";
/// File holding the deployed revision
pub const REVISION_FILE: &str = "REVISION";

/// Lifecycle state of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    Pending,
    Active,
    Superseded,
    Failed,
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReleaseStatus::Pending => "pending",
            ReleaseStatus::Active => "active",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    id: ReleaseId,
    path: PathBuf,
    status: ReleaseStatus,
}

impl Release {
    pub fn new(id: ReleaseId, path: impl Into<PathBuf>, status: ReleaseStatus) -> Self {
        Self {
            id,
            path: path.into(),
            status,
        }
    }

    pub fn id(&self) -> &ReleaseId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> ReleaseStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.id.created_at()
    }

    pub fn is_active(&self) -> bool {
        self.status == ReleaseStatus::Active
    }

    /// Completed releases that could serve traffic (active or superseded)
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status,
            ReleaseStatus::Active | ReleaseStatus::Superseded
        )
    }

    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = status;
        self
    }
}
