//! The adapter conformance suite.
//!
//! Every function takes a fresh, empty adapter and asserts one observable
//! behavior of the storage contract. Backends run the whole suite through
//! the [`conformance_tests!`](crate::conformance_tests) macro; the
//! in-memory reference store defines the expected answers.

use std::sync::mpsc::sync_channel;

use serde_json::json;

use weave_store::{Adapter, MapFilter, Pagination, SegmentFilter, StoreEvent};
use weave_types::{Evidence, LinkHash};

use crate::fixtures::{child_link, distinct_priority_links, root_link, TestLinkBuilder};

fn page(offset: usize, limit: usize) -> Pagination {
    Pagination::new(offset, limit)
}

fn segments_filter(pagination: Pagination) -> SegmentFilter {
    SegmentFilter {
        pagination,
        ..SegmentFilter::default()
    }
}

fn maps_filter(pagination: Pagination) -> MapFilter {
    MapFilter {
        pagination,
        ..MapFilter::default()
    }
}

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

pub fn get_info_reports_identity<A: Adapter>(adapter: &A) {
    let info = adapter.get_info().expect("get_info should succeed");
    assert!(!info.name.is_empty());
    assert!(!info.description.is_empty());
}

// ---------------------------------------------------------------------------
// Link creation
// ---------------------------------------------------------------------------

pub fn create_link_returns_the_content_hash<A: Adapter>(adapter: &A) {
    let link = root_link("m1", "p");
    let expected = link.hash().unwrap();

    let link_hash = adapter.create_link(&link).unwrap();
    assert_eq!(link_hash, expected);

    let segment = adapter.get_segment(&link_hash).unwrap().expect("created");
    assert_eq!(segment.meta.link_hash, link_hash);
    assert_eq!(segment.link, link);
    assert!(segment.meta.evidences.is_empty());
}

pub fn create_link_is_idempotent<A: Adapter>(adapter: &A) {
    let link = root_link("m1", "p");
    let first = adapter.create_link(&link).unwrap();
    let second = adapter.create_link(&link).unwrap();
    assert_eq!(first, second);

    let found = adapter.find_segments(&segments_filter(page(0, 10))).unwrap();
    assert_eq!(found.len(), 1);
}

pub fn create_link_rejects_invalid_links<A: Adapter>(adapter: &A) {
    let mut link = root_link("m1", "p");
    link.meta.process.clear();
    let err = adapter.create_link(&link).unwrap_err();
    assert!(err.is_validation());

    let found = adapter.find_segments(&segments_filter(page(0, 10))).unwrap();
    assert!(found.is_empty());
}

pub fn get_segment_missing_is_none<A: Adapter>(adapter: &A) {
    let absent = LinkHash::from_hash([0xee; 32]);
    assert!(adapter.get_segment(&absent).unwrap().is_none());
}

pub fn chain_growth_links_parent_and_child<A: Adapter>(adapter: &A) {
    let parent_hash = adapter.create_link(&root_link("m1", "p")).unwrap();
    let child = child_link(&parent_hash, "m1", "p");
    let child_hash = adapter.create_link(&child).unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            map_ids: vec!["m1".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(found.len(), 2);
    let hashes: Vec<LinkHash> = found.iter().map(|s| s.meta.link_hash).collect();
    assert!(hashes.contains(&parent_hash));
    assert!(hashes.contains(&child_hash));
}

pub fn segments_always_hash_to_their_key<A: Adapter>(adapter: &A) {
    let links = [
        root_link("m1", "p1"),
        root_link("m2", "p2"),
        TestLinkBuilder::new("m1", "p1")
            .with_state(json!({"n": 1}))
            .with_tags(["a", "b"])
            .with_priority(4.0)
            .build(),
    ];
    for link in &links {
        let link_hash = adapter.create_link(link).unwrap();
        let segment = adapter.get_segment(&link_hash).unwrap().unwrap();
        assert_eq!(segment.link.hash().unwrap(), segment.meta.link_hash);
        assert_eq!(segment.meta.link_hash, link_hash);
    }
}

// ---------------------------------------------------------------------------
// FindSegments
// ---------------------------------------------------------------------------

pub fn find_segments_filters_by_map_ids<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter.create_link(&root_link("m2", "p")).unwrap();
    adapter.create_link(&root_link("m3", "p")).unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            map_ids: vec!["m1".into(), "m3".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    let mut map_ids: Vec<&str> = found.iter().map(|s| s.link.map_id()).collect();
    map_ids.sort();
    assert_eq!(map_ids, ["m1", "m3"]);
}

pub fn find_segments_empty_map_ids_is_unrestricted<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter.create_link(&root_link("m2", "p")).unwrap();

    let found = adapter.find_segments(&segments_filter(page(0, 10))).unwrap();
    assert_eq!(found.len(), 2);
}

pub fn find_segments_filters_by_process<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p1")).unwrap();
    adapter.create_link(&root_link("m2", "p2")).unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            process: Some("p2".into()),
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].link.process(), "p2");
}

pub fn find_segments_matches_roots_on_empty_prev<A: Adapter>(adapter: &A) {
    let parent_hash = adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter
        .create_link(&child_link(&parent_hash, "m1", "p"))
        .unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            prev_link_hash: Some(String::new()),
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta.link_hash, parent_hash);
}

pub fn find_segments_matches_children_of_parent<A: Adapter>(adapter: &A) {
    let parent_hash = adapter.create_link(&root_link("m1", "p")).unwrap();
    let child_hash = adapter
        .create_link(&child_link(&parent_hash, "m1", "p"))
        .unwrap();
    adapter.create_link(&root_link("m2", "p")).unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            // A prev constraint combined with map restriction still works.
            map_ids: vec!["m1".into()],
            prev_link_hash: Some(parent_hash.to_hex()),
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].meta.link_hash, child_hash);
}

pub fn find_segments_tags_are_all_of<A: Adapter>(adapter: &A) {
    adapter
        .create_link(
            &TestLinkBuilder::new("m1", "p")
                .with_tags(["one", "two"])
                .build(),
        )
        .unwrap();
    adapter
        .create_link(&TestLinkBuilder::new("m2", "p").with_tags(["one"]).build())
        .unwrap();

    let both = adapter
        .find_segments(&SegmentFilter {
            tags: vec!["one".into(), "two".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].link.map_id(), "m1");

    let one = adapter
        .find_segments(&SegmentFilter {
            tags: vec!["one".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(one.len(), 2);
}

pub fn find_segments_filters_by_link_hashes<A: Adapter>(adapter: &A) {
    let h1 = adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter.create_link(&root_link("m2", "p")).unwrap();
    let h3 = adapter.create_link(&root_link("m3", "p")).unwrap();

    let found = adapter
        .find_segments(&SegmentFilter {
            link_hashes: vec![h1.to_hex(), h3.to_hex()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    let mut hashes: Vec<String> = found.iter().map(|s| s.meta.link_hash.to_hex()).collect();
    hashes.sort();
    let mut expected = vec![h1.to_hex(), h3.to_hex()];
    expected.sort();
    assert_eq!(hashes, expected);
}

pub fn find_segments_orders_by_priority_then_hash<A: Adapter>(adapter: &A) {
    for link in distinct_priority_links("m1", "p", 4) {
        adapter.create_link(&link).unwrap();
    }
    // Two links without priority sort last, among themselves by hash.
    adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter
        .create_link(
            &TestLinkBuilder::new("m1", "p")
                .with_state(json!({"other": true}))
                .build(),
        )
        .unwrap();

    let found = adapter.find_segments(&segments_filter(page(0, 10))).unwrap();
    assert_eq!(found.len(), 6);

    let priorities: Vec<Option<f64>> = found.iter().map(|s| s.link.meta.priority).collect();
    assert_eq!(
        priorities,
        [Some(3.0), Some(2.0), Some(1.0), Some(0.0), None, None]
    );
    assert!(found[4].meta.link_hash < found[5].meta.link_hash);
}

pub fn find_segments_pagination_is_deterministic<A: Adapter>(adapter: &A) {
    for link in distinct_priority_links("m1", "p", 10) {
        adapter.create_link(&link).unwrap();
    }

    let filter = segments_filter(page(3, 3));
    let first = adapter.find_segments(&filter).unwrap();
    let second = adapter.find_segments(&filter).unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    // Priorities 9..0 descending, so page [3..6) is 6, 5, 4.
    let priorities: Vec<f64> = first.iter().map(|s| s.link.meta.priority.unwrap()).collect();
    assert_eq!(priorities, [6.0, 5.0, 4.0]);
}

pub fn find_segments_limit_zero_is_empty<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p")).unwrap();
    let found = adapter.find_segments(&segments_filter(page(0, 0))).unwrap();
    assert!(found.is_empty());
}

pub fn find_segments_offset_beyond_end_is_empty<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p")).unwrap();
    let found = adapter.find_segments(&segments_filter(page(5, 10))).unwrap();
    assert!(found.is_empty());
}

// ---------------------------------------------------------------------------
// GetMapIDs
// ---------------------------------------------------------------------------

pub fn get_map_ids_sorted_lexicographically<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m2", "p")).unwrap();
    adapter.create_link(&root_link("m10", "p")).unwrap();
    adapter.create_link(&root_link("m1", "p")).unwrap();

    let map_ids = adapter.get_map_ids(&maps_filter(page(0, 10))).unwrap();
    assert_eq!(map_ids, ["m1", "m10", "m2"]);
}

pub fn get_map_ids_filters_by_process<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p1")).unwrap();
    adapter.create_link(&root_link("m2", "p2")).unwrap();

    let map_ids = adapter
        .get_map_ids(&MapFilter {
            process: Some("p1".into()),
            pagination: page(0, 10),
        })
        .unwrap();
    assert_eq!(map_ids, ["m1"]);

    let map_ids = adapter
        .get_map_ids(&MapFilter {
            process: Some("absent".into()),
            pagination: page(0, 10),
        })
        .unwrap();
    assert!(map_ids.is_empty());
}

pub fn get_map_ids_paginates<A: Adapter>(adapter: &A) {
    for i in 0..5 {
        adapter.create_link(&root_link(&format!("m{i}"), "p")).unwrap();
    }

    let map_ids = adapter.get_map_ids(&maps_filter(page(1, 2))).unwrap();
    assert_eq!(map_ids, ["m1", "m2"]);

    let map_ids = adapter.get_map_ids(&maps_filter(page(0, 0))).unwrap();
    assert!(map_ids.is_empty());
}

// ---------------------------------------------------------------------------
// Evidences
// ---------------------------------------------------------------------------

pub fn evidence_roundtrip<A: Adapter>(adapter: &A) {
    let link_hash = adapter.create_link(&root_link("m1", "p")).unwrap();
    assert!(adapter.get_evidences(&link_hash).unwrap().is_none());

    let evidence = Evidence::new("batchfossilizer", "alice").with_proof(json!({"t": 1}));
    adapter.add_evidence(&link_hash, &evidence).unwrap();

    let evidences = adapter.get_evidences(&link_hash).unwrap().unwrap();
    assert_eq!(evidences.len(), 1);
    assert_eq!(
        evidences.find("batchfossilizer", "alice"),
        Some(&evidence)
    );

    let segment = adapter.get_segment(&link_hash).unwrap().unwrap();
    assert_eq!(segment.meta.evidences.len(), 1);
}

pub fn evidence_duplicate_pair_conflicts<A: Adapter>(adapter: &A) {
    let link_hash = adapter.create_link(&root_link("m1", "p")).unwrap();

    adapter
        .add_evidence(&link_hash, &Evidence::new("b", "p1"))
        .unwrap();
    let err = adapter
        .add_evidence(&link_hash, &Evidence::new("b", "p1"))
        .unwrap_err();
    assert!(err.is_conflict());

    // State unchanged; a different provider still succeeds.
    assert_eq!(adapter.get_evidences(&link_hash).unwrap().unwrap().len(), 1);
    adapter
        .add_evidence(&link_hash, &Evidence::new("b", "p2"))
        .unwrap();
    assert_eq!(adapter.get_evidences(&link_hash).unwrap().unwrap().len(), 2);
}

pub fn evidence_allowed_before_link_exists<A: Adapter>(adapter: &A) {
    let link_hash = LinkHash::from_hash([0x42; 32]);
    adapter
        .add_evidence(&link_hash, &Evidence::new("b", "p"))
        .unwrap();
    let evidences = adapter.get_evidences(&link_hash).unwrap().unwrap();
    assert_eq!(evidences.len(), 1);
}

// ---------------------------------------------------------------------------
// Key-value store
// ---------------------------------------------------------------------------

pub fn key_value_roundtrip<A: Adapter>(adapter: &A) {
    assert!(adapter.get_value(b"key").unwrap().is_none());

    adapter.set_value(b"key", b"value").unwrap();
    assert_eq!(adapter.get_value(b"key").unwrap().unwrap(), b"value");

    adapter.set_value(b"key", b"updated").unwrap();
    assert_eq!(adapter.get_value(b"key").unwrap().unwrap(), b"updated");

    let previous = adapter.delete_value(b"key").unwrap().unwrap();
    assert_eq!(previous, b"updated");
    assert!(adapter.get_value(b"key").unwrap().is_none());
    assert!(adapter.delete_value(b"key").unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub fn events_delivered_per_write_in_order<A: Adapter>(adapter: &A) {
    let (tx, rx) = sync_channel(16);
    adapter.add_event_channel(tx);

    let link = root_link("m1", "p");
    let link_hash = adapter.create_link(&link).unwrap();
    let evidence = Evidence::new("b", "p");
    adapter.add_evidence(&link_hash, &evidence).unwrap();

    assert_eq!(rx.recv().unwrap(), StoreEvent::saved_links(link));
    assert_eq!(
        rx.recv().unwrap(),
        StoreEvent::saved_evidence(link_hash, evidence)
    );
    // Exactly one event per accepted write.
    assert!(rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Buffered batches
// ---------------------------------------------------------------------------

pub fn batch_overlay_read_your_writes<A: Adapter>(adapter: &A) {
    let base_hash = adapter.create_link(&root_link("m0", "p")).unwrap();

    let mut batch = adapter.new_batch().unwrap();
    let staged_hash = batch.create_link(&root_link("m1", "p")).unwrap();

    // Staged link is visible inside the batch.
    let segment = batch.get_segment(&staged_hash).unwrap().unwrap();
    assert_eq!(segment.link.map_id(), "m1");

    // Base content is visible through the batch too.
    assert!(batch.get_segment(&base_hash).unwrap().is_some());

    // Queries see the union.
    let found = batch.find_segments(&segments_filter(page(0, 10))).unwrap();
    assert_eq!(found.len(), 2);
}

pub fn batch_base_untouched_until_write<A: Adapter>(adapter: &A) {
    let mut batch = adapter.new_batch().unwrap();
    let staged_hash = batch.create_link(&root_link("m1", "p")).unwrap();

    assert!(adapter.get_segment(&staged_hash).unwrap().is_none());
    assert!(adapter
        .find_segments(&segments_filter(page(0, 10)))
        .unwrap()
        .is_empty());

    batch.write().unwrap();
    assert!(adapter.get_segment(&staged_hash).unwrap().is_some());
}

pub fn batch_commit_replays_in_order_with_events<A: Adapter>(adapter: &A) {
    let (tx, rx) = sync_channel(16);
    adapter.add_event_channel(tx);

    let l1 = root_link("m1", "p");
    let mut batch = adapter.new_batch().unwrap();
    let h1 = batch.create_link(&l1).unwrap();
    let l2 = child_link(&h1, "m1", "p");
    batch.create_link(&l2).unwrap();

    let staged = batch
        .find_segments(&SegmentFilter {
            map_ids: vec!["m1".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(staged.len(), 2);
    assert!(rx.try_recv().is_err(), "no events before commit");

    batch.write().unwrap();

    let committed = adapter
        .find_segments(&SegmentFilter {
            map_ids: vec!["m1".into()],
            pagination: page(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(committed.len(), 2);

    // Events surface from the base adapter, one per replayed op, in
    // stage order.
    assert_eq!(rx.recv().unwrap(), StoreEvent::saved_links(l1));
    assert_eq!(rx.recv().unwrap(), StoreEvent::saved_links(l2));
    assert!(rx.try_recv().is_err());
}

pub fn batch_evidence_conflict_detected_at_stage<A: Adapter>(adapter: &A) {
    let link_hash = adapter.create_link(&root_link("m1", "p")).unwrap();
    adapter
        .add_evidence(&link_hash, &Evidence::new("b", "p"))
        .unwrap();

    let mut batch = adapter.new_batch().unwrap();

    // Conflicts with the base.
    let err = batch
        .add_evidence(&link_hash, &Evidence::new("b", "p"))
        .unwrap_err();
    assert!(err.is_conflict());

    // A fresh pair stages fine, then conflicts with itself.
    batch
        .add_evidence(&link_hash, &Evidence::new("b2", "p"))
        .unwrap();
    let err = batch
        .add_evidence(&link_hash, &Evidence::new("b2", "p"))
        .unwrap_err();
    assert!(err.is_conflict());

    // Overlay merges base and staged evidences.
    let evidences = batch.get_evidences(&link_hash).unwrap().unwrap();
    assert_eq!(evidences.len(), 2);

    batch.write().unwrap();
    let evidences = adapter.get_evidences(&link_hash).unwrap().unwrap();
    assert_eq!(evidences.len(), 2);
}

pub fn batch_kv_overlay<A: Adapter>(adapter: &A) {
    adapter.set_value(b"shared", b"base").unwrap();
    adapter.set_value(b"doomed", b"base").unwrap();

    let mut batch = adapter.new_batch().unwrap();
    batch.set_value(b"shared", b"staged").unwrap();
    let previous = batch.delete_value(b"doomed").unwrap().unwrap();
    assert_eq!(previous, b"base");

    // Staged set wins; staged delete reads as absent; base unchanged.
    assert_eq!(batch.get_value(b"shared").unwrap().unwrap(), b"staged");
    assert!(batch.get_value(b"doomed").unwrap().is_none());
    assert_eq!(adapter.get_value(b"shared").unwrap().unwrap(), b"base");
    assert_eq!(adapter.get_value(b"doomed").unwrap().unwrap(), b"base");

    batch.write().unwrap();
    assert_eq!(adapter.get_value(b"shared").unwrap().unwrap(), b"staged");
    assert!(adapter.get_value(b"doomed").unwrap().is_none());
}

pub fn batch_map_ids_overlay<A: Adapter>(adapter: &A) {
    adapter.create_link(&root_link("m1", "p1")).unwrap();

    let mut batch = adapter.new_batch().unwrap();
    batch.create_link(&root_link("m2", "p1")).unwrap();
    batch.create_link(&root_link("m3", "p2")).unwrap();

    let map_ids = batch.get_map_ids(&maps_filter(page(0, 10))).unwrap();
    assert_eq!(map_ids, ["m1", "m2", "m3"]);

    let map_ids = batch
        .get_map_ids(&MapFilter {
            process: Some("p1".into()),
            pagination: page(0, 10),
        })
        .unwrap();
    assert_eq!(map_ids, ["m1", "m2"]);

    // The base still only knows its own map.
    let map_ids = adapter.get_map_ids(&maps_filter(page(0, 10))).unwrap();
    assert_eq!(map_ids, ["m1"]);
}
