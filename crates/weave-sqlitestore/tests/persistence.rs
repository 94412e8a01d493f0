//! A dump-and-reload of the backend reproduces identical query results.

use serde_json::json;

use weave_sqlitestore::{SqliteStore, SqliteStoreConfig};
use weave_store::{
    KeyValueStore, MapFilter, Pagination, SegmentFilter, StoreReader, StoreWriter,
};
use weave_storetesting::fixtures::{child_link, root_link, TestLinkBuilder};
use weave_types::Evidence;

fn config(path: &std::path::Path) -> SqliteStoreConfig {
    SqliteStoreConfig {
        path: Some(path.to_path_buf()),
        version: "0.1.0".into(),
        commit: "test".into(),
    }
}

#[test]
fn reopened_store_reproduces_query_results() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("weave.db");

    let filter = SegmentFilter {
        map_ids: vec!["m1".into()],
        pagination: Pagination::new(0, 10),
        ..SegmentFilter::default()
    };
    let maps = MapFilter {
        pagination: Pagination::new(0, 10),
        ..MapFilter::default()
    };

    let (before_segments, before_maps, link_hash) = {
        let store = SqliteStore::open(config(&db_path)).unwrap();
        let root_hash = store.create_link(&root_link("m1", "p")).unwrap();
        store
            .create_link(&child_link(&root_hash, "m1", "p"))
            .unwrap();
        store
            .create_link(
                &TestLinkBuilder::new("m2", "p")
                    .with_priority(5.0)
                    .with_tags(["keep"])
                    .build(),
            )
            .unwrap();
        store
            .add_evidence(&root_hash, &Evidence::new("b", "p").with_proof(json!({"t": 1})))
            .unwrap();
        store.set_value(b"key", b"value").unwrap();

        (
            store.find_segments(&filter).unwrap(),
            store.get_map_ids(&maps).unwrap(),
            root_hash,
        )
    };

    // Reopen from disk and compare every query surface.
    let store = SqliteStore::open(config(&db_path)).unwrap();
    assert_eq!(store.find_segments(&filter).unwrap(), before_segments);
    assert_eq!(store.get_map_ids(&maps).unwrap(), before_maps);

    let segment = store.get_segment(&link_hash).unwrap().unwrap();
    assert_eq!(segment.meta.link_hash, link_hash);
    assert_eq!(segment.meta.evidences.len(), 1);
    assert_eq!(store.get_value(b"key").unwrap().unwrap(), b"value");

    let tagged = store
        .find_segments(&SegmentFilter {
            tags: vec!["keep".into()],
            pagination: Pagination::new(0, 10),
            ..SegmentFilter::default()
        })
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].link.map_id(), "m2");
}
