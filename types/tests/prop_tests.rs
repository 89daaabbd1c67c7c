use proptest::prelude::*;

use dirauth_types::{param_order, Digest256, IdentityDigest, NetParams, Timestamp};

proptest! {
    /// IdentityDigest hex roundtrip: to_hex -> from_hex produces identical digest.
    #[test]
    fn identity_hex_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let id = IdentityDigest::new(bytes);
        let parsed = IdentityDigest::from_hex(&id.to_hex()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Digest256::is_zero is true only for all-zero bytes.
    #[test]
    fn digest_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let d = Digest256::new(bytes);
        prop_assert_eq!(d.is_zero(), bytes == [0u8; 32]);
    }

    /// Digest bincode serialization roundtrip.
    #[test]
    fn digest_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let d = Digest256::new(bytes);
        let encoded = bincode::serialize(&d).unwrap();
        let decoded: Digest256 = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, d);
    }

    /// Timestamp ISO roundtrip for every second up to year 9999.
    #[test]
    fn timestamp_iso_roundtrip(secs in 0u64..253_402_300_799) {
        let ts = Timestamp::new(secs);
        prop_assert_eq!(Timestamp::parse_iso(&ts.to_iso()).unwrap(), ts);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
    }

    /// Any unique key set with i32 values, put in token order, parses
    /// back to itself.
    #[test]
    fn params_display_parse_roundtrip(
        map in prop::collection::btree_map("[a-z][a-z0-9-]{0,8}", any::<i32>(), 0..8)
    ) {
        let mut entries: Vec<(String, i32)> = map.into_iter().collect();
        entries.sort_by(|a, b| param_order(&a.0, &b.0));
        let params = NetParams::from_sorted(entries).unwrap();
        let reparsed = NetParams::parse(&params.to_string()).unwrap();
        prop_assert_eq!(reparsed, params);
    }
}
