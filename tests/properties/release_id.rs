//! Property tests for release id generation and ordering.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use capstan::domain::value_objects::ReleaseId;

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. 2090-01-01
    (946_684_800i64..3_786_912_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: lexical order of ids matches chronological order.
    #[test]
    fn property_id_order_is_chronological(a in instant(), b in instant()) {
        let ia = ReleaseId::from_datetime(a);
        let ib = ReleaseId::from_datetime(b);
        prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
        prop_assert_eq!(ia.created_at(), a);
    }

    /// PROPERTY: a new id always sorts after every existing one, whatever
    /// the clock says.
    #[test]
    fn property_next_id_sorts_last(
        now in instant(),
        existing in proptest::collection::vec(instant(), 0..8),
    ) {
        let existing: Vec<ReleaseId> = existing.into_iter().map(ReleaseId::from_datetime).collect();
        let next = ReleaseId::next(now, &existing);
        prop_assert!(existing.iter().all(|id| *id < next));
        prop_assert_eq!(ReleaseId::parse(next.as_str()), Some(next.clone()));
    }

    /// PROPERTY: parsing never panics and only accepts 14-digit names.
    #[test]
    fn property_parse_never_panics(name in "[0-9a-z._-]{0,20}") {
        if let Some(id) = ReleaseId::parse(&name) {
            prop_assert_eq!(id.as_str().len(), 14);
        }
    }
}
