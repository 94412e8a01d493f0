//! Batch replay is not all-or-nothing: a failed operation stops further
//! replay and already-applied operations remain applied.

use weave_store::{Adapter, KeyValueStore, StoreError, StoreReader};
use weave_storetesting::fixtures::root_link;
use weave_storetesting::MockAdapter;

#[test]
fn failed_replay_stops_and_keeps_the_applied_prefix() {
    let base = MockAdapter::new().with_create_link_quota(1);

    let mut batch = base.new_batch().unwrap();
    let h1 = batch.create_link(&root_link("m1", "p")).unwrap();
    let h2 = batch.create_link(&root_link("m2", "p")).unwrap();
    batch.set_value(b"key", b"value").unwrap();

    let err = batch.write().unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));

    // The first create was applied and stays applied.
    assert!(base.get_segment(&h1).unwrap().is_some());
    // Replay stopped at the second create; nothing after it ran.
    assert!(base.get_segment(&h2).unwrap().is_none());
    assert!(base.get_value(b"key").unwrap().is_none());
    assert_eq!(base.call_counts().create_link, 2);
    assert_eq!(base.call_counts().set_value, 0);
}

#[test]
fn successful_replay_applies_everything_in_order() {
    let base = MockAdapter::new();

    let mut batch = base.new_batch().unwrap();
    let h1 = batch.create_link(&root_link("m1", "p")).unwrap();
    batch.set_value(b"key", b"value").unwrap();
    batch.write().unwrap();

    assert!(base.get_segment(&h1).unwrap().is_some());
    assert_eq!(base.get_value(b"key").unwrap().unwrap(), b"value");
}

#[test]
fn concurrent_batches_are_independent() {
    let base = MockAdapter::new();

    let mut batch_a = base.new_batch().unwrap();
    let mut batch_b = base.new_batch().unwrap();

    let ha = batch_a.create_link(&root_link("ma", "p")).unwrap();
    let hb = batch_b.create_link(&root_link("mb", "p")).unwrap();

    // Neither batch sees the other's staged link.
    assert!(batch_a.get_segment(&hb).unwrap().is_none());
    assert!(batch_b.get_segment(&ha).unwrap().is_none());

    batch_a.write().unwrap();

    // After A commits, B sees A's link through the base.
    assert!(batch_b.get_segment(&ha).unwrap().is_some());
}
