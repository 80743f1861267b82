//! Property-based tests for folder normalization.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{folder_depth, folder_segments, is_valid_folder, normalize_folder, parent_folder};
    use proptest::prelude::*;

    // ============================================================================
    // normalize_folder property tests
    // ============================================================================

    proptest! {
        /// Property: normalize_folder always yields a canonical folder
        #[test]
        fn normalize_is_total(input in ".*") {
            let result = normalize_folder(&input);
            prop_assert!(
                is_valid_folder(&result),
                "normalize_folder produced invalid folder '{}' from input '{}'",
                result,
                input
            );
        }

        /// Property: normalizing twice is the same as normalizing once
        #[test]
        fn normalize_is_idempotent(input in ".*") {
            let once = normalize_folder(&input);
            let twice = normalize_folder(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: slash-heavy inputs keep their segments in order
        #[test]
        fn normalize_preserves_segments(
            segments in prop::collection::vec("[a-zA-Z0-9_.-]{1,8}", 0..6),
            separator in "[/\\\\]{1,3}",
        ) {
            let input = segments.join(&separator);
            let result = normalize_folder(&input);
            prop_assert_eq!(folder_segments(&result), segments.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert_eq!(folder_depth(&result), segments.len());
        }

        /// Property: a normalized folder starts with its parent
        #[test]
        fn parent_is_prefix(input in "[a-z/]{0,24}") {
            let folder = normalize_folder(&input);
            match parent_folder(&folder) {
                Some(parent) => {
                    prop_assert!(folder.starts_with(&parent));
                    prop_assert_eq!(folder_depth(&parent) + 1, folder_depth(&folder));
                }
                None => prop_assert_eq!(folder, "/"),
            }
        }
    }
}
