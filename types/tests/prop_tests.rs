use proptest::prelude::*;

use vpower_types::{Snapshot, Timestamp, PROXY_TO_SELF};

proptest! {
    /// Timestamp ordering agrees with nanosecond ordering.
    #[test]
    fn timestamp_order_matches_nanos(
        a in -1_000_000_000_000_000_000i128..4_000_000_000_000_000_000i128,
        b in -1_000_000_000_000_000_000i128..4_000_000_000_000_000_000i128,
    ) {
        let ta = Timestamp::from_unix_nanos(a).unwrap();
        let tb = Timestamp::from_unix_nanos(b).unwrap();
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }

    /// Rendered timestamps parse back to the same instant.
    #[test]
    fn rfc3339_rendering_is_parseable(nanos in 0i128..4_000_000_000_000_000_000i128) {
        let ts = Timestamp::from_unix_nanos(nanos).unwrap();
        prop_assert_eq!(Timestamp::parse(&ts.to_rfc3339()).unwrap(), ts);
    }

    /// Self stake is the raw stake exactly when the account has no proxy.
    #[test]
    fn self_stake_only_without_proxy(stake in any::<u64>(), proxied in any::<bool>()) {
        let snapshot = Snapshot {
            account_id: "1.2.100".into(),
            stake,
            proxy_id: if proxied { "1.2.200".into() } else { PROXY_TO_SELF.into() },
            proxy_for: Vec::new(),
            votes: Vec::new(),
            block_number: 1,
            block_time: Timestamp::from_unix_secs(0).unwrap(),
        };
        prop_assert_eq!(snapshot.self_stake(), if proxied { 0 } else { stake });
    }
}
