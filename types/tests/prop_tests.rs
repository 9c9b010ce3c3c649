use proptest::prelude::*;

use attest_types::{ContentId, Height, VerificationParams};

proptest! {
    /// Any 32-byte fingerprint survives Display -> FromStr.
    #[test]
    fn content_id_hex_parse_inverts_display(bytes in prop::array::uniform32(0u8..)) {
        let id = ContentId::new(bytes);
        let parsed: ContentId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// ContentId::is_zero is true only for all-zero bytes.
    #[test]
    fn content_id_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(ContentId::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// ContentId bincode encoding preserves identity (used by engine snapshots).
    #[test]
    fn content_id_bincode_preserves_identity(bytes in prop::array::uniform32(0u8..)) {
        let id = ContentId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: ContentId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Height ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn height_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Height::new(a) <= Height::new(b), a <= b);
    }

    /// blocks_since agrees with saturating arithmetic.
    #[test]
    fn height_blocks_since(start in 0u64..1_000_000, now in 0u64..1_000_000) {
        prop_assert_eq!(
            Height::new(now).blocks_since(Height::new(start)),
            now.saturating_sub(start)
        );
    }

    /// advanced_by then blocks_since recovers the advance.
    #[test]
    fn height_advance_then_measure(start in 0u64..1_000_000, blocks in 0u64..1_000_000) {
        let h = Height::new(start);
        prop_assert_eq!(h.advanced_by(blocks).blocks_since(h), blocks);
    }

    /// Params validation accepts exactly the thresholds in 0..=100.
    #[test]
    fn params_threshold_range(pct in 0u32..1_000) {
        let params = VerificationParams {
            verification_threshold_pct: pct,
            ..VerificationParams::default()
        };
        prop_assert_eq!(params.validate().is_ok(), pct <= 100);
    }
}
