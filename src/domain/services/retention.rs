//! Retention policy - which releases survive a cleanup
//!
//! Pure selection over a release listing; deletion is the pruner's job.
//!
//! Rules:
//! 1. The active release is always kept, whatever its id.
//! 2. Failed and pending releases that are not active are always deleted.
//! 3. Healthy releases fill the remaining `keep - 1` slots, newest first.

use std::num::NonZeroUsize;

use crate::domain::entities::Release;
use crate::domain::value_objects::ReleaseId;

/// Outcome of applying the retention policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePlan {
    /// Releases that stay, newest first (active first if present)
    pub keep: Vec<ReleaseId>,
    /// Releases to delete, oldest first
    pub delete: Vec<ReleaseId>,
}

impl PrunePlan {
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep: NonZeroUsize,
}

impl RetentionPolicy {
    pub fn new(keep: NonZeroUsize) -> Self {
        Self { keep }
    }

    pub fn plan(&self, releases: &[Release]) -> PrunePlan {
        let mut keep: Vec<ReleaseId> = Vec::new();
        let mut delete: Vec<ReleaseId> = Vec::new();

        if let Some(active) = releases.iter().find(|r| r.is_active()) {
            keep.push(active.id().clone());
        }

        let mut healthy: Vec<&Release> = Vec::new();
        for release in releases.iter().filter(|r| !r.is_active()) {
            if release.is_healthy() {
                healthy.push(release);
            } else {
                delete.push(release.id().clone());
            }
        }
        healthy.sort_by(|a, b| b.id().cmp(a.id()));

        for release in healthy {
            if keep.len() < self.keep.get() {
                keep.push(release.id().clone());
            } else {
                delete.push(release.id().clone());
            }
        }

        delete.sort();
        delete.dedup();
        PrunePlan { keep, delete }
    }
}
