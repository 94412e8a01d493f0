//! Conformance suite and fixtures for Weave adapters.
//!
//! The in-memory store is the reference implementation of the adapter
//! contract; every other backend must match its observable behavior for
//! identical input sequences. The [`suite`] module holds that contract as
//! executable tests, generic over any [`weave_store::Adapter`]; backends
//! instantiate the whole suite with [`conformance_tests!`]:
//!
//! ```ignore
//! weave_storetesting::conformance_tests!(MemoryStore::default());
//! ```
//!
//! [`fixtures`] provides link builders shared by the suite and backend
//! tests, and [`mock`] a scriptable adapter for failure-path testing.

pub mod fixtures;
pub mod mock;
pub mod suite;

pub use fixtures::TestLinkBuilder;
pub use mock::MockAdapter;

/// Instantiate the full conformance suite against a backend.
///
/// The argument is an expression producing a fresh, empty adapter; it is
/// evaluated once per test.
#[macro_export]
macro_rules! conformance_tests {
    ($make:expr) => {
        #[test]
        fn get_info_reports_identity() {
            $crate::suite::get_info_reports_identity(&$make);
        }
        #[test]
        fn create_link_returns_the_content_hash() {
            $crate::suite::create_link_returns_the_content_hash(&$make);
        }
        #[test]
        fn create_link_is_idempotent() {
            $crate::suite::create_link_is_idempotent(&$make);
        }
        #[test]
        fn create_link_rejects_invalid_links() {
            $crate::suite::create_link_rejects_invalid_links(&$make);
        }
        #[test]
        fn get_segment_missing_is_none() {
            $crate::suite::get_segment_missing_is_none(&$make);
        }
        #[test]
        fn chain_growth_links_parent_and_child() {
            $crate::suite::chain_growth_links_parent_and_child(&$make);
        }
        #[test]
        fn find_segments_filters_by_map_ids() {
            $crate::suite::find_segments_filters_by_map_ids(&$make);
        }
        #[test]
        fn find_segments_empty_map_ids_is_unrestricted() {
            $crate::suite::find_segments_empty_map_ids_is_unrestricted(&$make);
        }
        #[test]
        fn find_segments_filters_by_process() {
            $crate::suite::find_segments_filters_by_process(&$make);
        }
        #[test]
        fn find_segments_matches_roots_on_empty_prev() {
            $crate::suite::find_segments_matches_roots_on_empty_prev(&$make);
        }
        #[test]
        fn find_segments_matches_children_of_parent() {
            $crate::suite::find_segments_matches_children_of_parent(&$make);
        }
        #[test]
        fn find_segments_tags_are_all_of() {
            $crate::suite::find_segments_tags_are_all_of(&$make);
        }
        #[test]
        fn find_segments_filters_by_link_hashes() {
            $crate::suite::find_segments_filters_by_link_hashes(&$make);
        }
        #[test]
        fn find_segments_orders_by_priority_then_hash() {
            $crate::suite::find_segments_orders_by_priority_then_hash(&$make);
        }
        #[test]
        fn find_segments_pagination_is_deterministic() {
            $crate::suite::find_segments_pagination_is_deterministic(&$make);
        }
        #[test]
        fn find_segments_limit_zero_is_empty() {
            $crate::suite::find_segments_limit_zero_is_empty(&$make);
        }
        #[test]
        fn find_segments_offset_beyond_end_is_empty() {
            $crate::suite::find_segments_offset_beyond_end_is_empty(&$make);
        }
        #[test]
        fn get_map_ids_sorted_lexicographically() {
            $crate::suite::get_map_ids_sorted_lexicographically(&$make);
        }
        #[test]
        fn get_map_ids_filters_by_process() {
            $crate::suite::get_map_ids_filters_by_process(&$make);
        }
        #[test]
        fn get_map_ids_paginates() {
            $crate::suite::get_map_ids_paginates(&$make);
        }
        #[test]
        fn segments_always_hash_to_their_key() {
            $crate::suite::segments_always_hash_to_their_key(&$make);
        }
        #[test]
        fn evidence_roundtrip() {
            $crate::suite::evidence_roundtrip(&$make);
        }
        #[test]
        fn evidence_duplicate_pair_conflicts() {
            $crate::suite::evidence_duplicate_pair_conflicts(&$make);
        }
        #[test]
        fn evidence_allowed_before_link_exists() {
            $crate::suite::evidence_allowed_before_link_exists(&$make);
        }
        #[test]
        fn key_value_roundtrip() {
            $crate::suite::key_value_roundtrip(&$make);
        }
        #[test]
        fn events_delivered_per_write_in_order() {
            $crate::suite::events_delivered_per_write_in_order(&$make);
        }
        #[test]
        fn batch_overlay_read_your_writes() {
            $crate::suite::batch_overlay_read_your_writes(&$make);
        }
        #[test]
        fn batch_base_untouched_until_write() {
            $crate::suite::batch_base_untouched_until_write(&$make);
        }
        #[test]
        fn batch_commit_replays_in_order_with_events() {
            $crate::suite::batch_commit_replays_in_order_with_events(&$make);
        }
        #[test]
        fn batch_evidence_conflict_detected_at_stage() {
            $crate::suite::batch_evidence_conflict_detected_at_stage(&$make);
        }
        #[test]
        fn batch_kv_overlay() {
            $crate::suite::batch_kv_overlay(&$make);
        }
        #[test]
        fn batch_map_ids_overlay() {
            $crate::suite::batch_map_ids_overlay(&$make);
        }
    };
}
