//! Property tests for the retention policy.

use std::num::NonZeroUsize;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use capstan::domain::entities::{Release, ReleaseStatus};
use capstan::domain::services::RetentionPolicy;
use capstan::domain::value_objects::ReleaseId;

fn status() -> impl Strategy<Value = ReleaseStatus> {
    prop_oneof![
        4 => Just(ReleaseStatus::Superseded),
        1 => Just(ReleaseStatus::Failed),
        1 => Just(ReleaseStatus::Pending),
    ]
}

/// Distinct releases, at most one active, in arbitrary order
fn releases() -> impl Strategy<Value = Vec<Release>> {
    (
        proptest::collection::btree_set(0u32..10_000, 0..16),
        any::<prop::sample::Index>(),
        any::<bool>(),
    )
        .prop_flat_map(|(seconds, active_at, has_active)| {
            let n = seconds.len();
            (
                Just(seconds.into_iter().collect::<Vec<_>>()),
                proptest::collection::vec(status(), n),
                Just(if has_active && n > 0 { Some(active_at.index(n)) } else { None }),
            )
        })
        .prop_map(|(seconds, statuses, active)| {
            seconds
                .iter()
                .zip(statuses)
                .enumerate()
                .map(|(i, (s, status))| {
                    let at = Utc.timestamp_opt(1_700_000_000 + i64::from(*s), 0).unwrap();
                    let id = ReleaseId::from_datetime(at);
                    let status = if Some(i) == active { ReleaseStatus::Active } else { status };
                    Release::new(id.clone(), format!("/srv/releases/{}", id), status)
                })
                .rev()
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: the active release is never deleted, and exactly
    /// min(keep, healthy) releases remain.
    #[test]
    fn property_prune_keeps_active_and_window(
        releases in releases(),
        keep in 1usize..6,
    ) {
        let policy = RetentionPolicy::new(NonZeroUsize::new(keep).unwrap());
        let plan = policy.plan(&releases);

        if let Some(active) = releases.iter().find(|r| r.is_active()) {
            prop_assert!(plan.keep.contains(active.id()));
            prop_assert!(!plan.delete.contains(active.id()));
        }

        let healthy = releases.iter().filter(|r| r.is_healthy()).count();
        prop_assert_eq!(plan.keep.len(), keep.min(healthy));
        prop_assert_eq!(plan.keep.len() + plan.delete.len(), releases.len());
    }

    /// PROPERTY: unhealthy releases never survive a prune.
    #[test]
    fn property_prune_deletes_unhealthy(releases in releases(), keep in 1usize..6) {
        let plan = RetentionPolicy::new(NonZeroUsize::new(keep).unwrap()).plan(&releases);
        for release in releases.iter().filter(|r| !r.is_healthy()) {
            prop_assert!(plan.delete.contains(release.id()));
        }
    }
}
