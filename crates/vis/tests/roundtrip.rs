//! Property tests for the encode/decode round-trip law.

use omtree_vis::{VisFlags, unvis, vis};
use proptest::prelude::*;

fn flag_sets() -> impl Strategy<Value = VisFlags> {
    prop_oneof![
        Just(VisFlags::MANIFEST),
        Just(VisFlags::empty()),
        Just(VisFlags::OCTAL),
        Just(VisFlags::WHITESPACE | VisFlags::CSTYLE),
        Just(VisFlags::WHITESPACE | VisFlags::CSTYLE | VisFlags::GLOB),
        Just(VisFlags::WHITESPACE | VisFlags::OCTAL | VisFlags::GLOB | VisFlags::SAFE),
        Just(VisFlags::HTTP_STYLE),
    ]
}

proptest! {
    #[test]
    fn unvis_inverts_vis(bytes in proptest::collection::vec(any::<u8>(), 0..256), flags in flag_sets()) {
        let encoded = vis(&bytes, flags);
        let decoded = unvis(&encoded, flags).expect("encoder output must decode");
        prop_assert_eq!(decoded, bytes);
    }

    #[test]
    fn manifest_encoding_is_token_safe(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let encoded = vis(&bytes, VisFlags::MANIFEST);
        prop_assert!(encoded.is_ascii());
        prop_assert!(!encoded.contains(' '));
        prop_assert!(!encoded.contains('\t'));
        prop_assert!(!encoded.contains('\n'));
        prop_assert!(!encoded.contains('#'));
    }
}
