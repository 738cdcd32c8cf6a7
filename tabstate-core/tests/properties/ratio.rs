//! Split ratio bounds
//!
//! **Properties:** clamping always lands in `20..=80`, and raw patches
//! outside that range are rejected without a write.

use std::sync::Arc;

use proptest::prelude::*;
use tabstate_core::models::{MAX_SPLIT_RATIO, MIN_SPLIT_RATIO};
use tabstate_core::{
    MemoryStorage, SplitRatio, Tab, TabError, TabPatch, TabRepository, ValidationError,
};

proptest! {
    #[test]
    fn clamped_ratio_is_in_range(value in any::<i64>()) {
        let ratio = SplitRatio::clamped(value).value();
        prop_assert!((MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&ratio));
        if (i64::from(MIN_SPLIT_RATIO)..=i64::from(MAX_SPLIT_RATIO)).contains(&value) {
            prop_assert_eq!(i64::from(ratio), value);
        }
    }

    #[test]
    fn try_new_accepts_exactly_the_allowed_range(value in -200i64..300) {
        let allowed = (20..=80).contains(&value);
        prop_assert_eq!(SplitRatio::try_new(value).is_ok(), allowed);
    }

    #[test]
    fn out_of_range_patch_is_rejected(value in prop_oneof![-100i64..20, 81i64..200]) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create runtime");
        rt.block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let repository = TabRepository::open(storage.clone()).await.unwrap();
            let split = Tab::split_view(vec![Tab::web("a", "https://a.test")]).unwrap();
            let split = repository.add_tab(split, None).await.unwrap();
            let writes = storage.stats().writes();

            let patch = TabPatch::new().with_split_ratio(value);
            let err = repository.update_tab(&split.id, &patch).await.unwrap_err();
            assert!(matches!(
                err,
                TabError::Validation(ValidationError::SplitRatioOutOfRange(v)) if v == value
            ));
            assert_eq!(storage.stats().writes(), writes);
        });
    }
}
