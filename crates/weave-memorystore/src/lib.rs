//! Reference in-memory store.
//!
//! [`MemoryStore`] keeps all segments in four maps behind a single
//! readers-writer lock. It is unoptimized and not meant for production; it
//! exists as the conformance oracle for the adapter contract — any other
//! backend's observable behavior must match it for identical input
//! sequences (modulo the documented duplicate-insert choice).

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use weave_batch::BufferedBatch;
use weave_store::filter::sort_map_ids;
use weave_store::{
    event, sort_segments, Adapter, Batch, EventSender, KeyValueStore, MapFilter, SegmentFilter,
    StoreError, StoreEvent, StoreInfo, StoreReader, StoreResult, StoreWriter,
};
use weave_types::{Evidence, Evidences, Link, LinkHash, Segment, SegmentMeta};

/// Name reported in the store's information.
pub const NAME: &str = "memory";

/// Description reported in the store's information.
pub const DESCRIPTION: &str = "Weave reference in-memory store";

/// Configuration options for the store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStoreConfig {
    /// Version string reported in the store's information.
    pub version: String,
    /// Git commit hash reported in the store's information.
    pub commit: String,
}

/// The reference adapter. All operations hold one readers-writer lock:
/// writes exclusive, reads shared. Events are published inside the write
/// critical section so event order equals write order.
pub struct MemoryStore {
    config: MemoryStoreConfig,
    state: RwLock<State>,
    event_chans: RwLock<Vec<EventSender>>,
}

#[derive(Default)]
struct State {
    links: HashMap<LinkHash, Link>,
    evidences: HashMap<LinkHash, Evidences>,
    /// Map IDs to the set of member link hashes.
    maps: HashMap<String, HashSet<LinkHash>>,
    /// Hex-rendered keys to values.
    values: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State::default()),
            event_chans: RwLock::new(Vec::new()),
        }
    }

    /// Number of links currently stored.
    pub fn len(&self) -> usize {
        self.state.read().expect("store lock poisoned").links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Internal("store lock poisoned".into()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Internal("store lock poisoned".into()))
    }

    fn publish(&self, event: &StoreEvent) -> StoreResult<()> {
        let chans = self
            .event_chans
            .read()
            .map_err(|_| StoreError::Internal("event channel lock poisoned".into()))?;
        event::deliver(&chans, event);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

fn materialize(state: &State, link_hash: &LinkHash) -> Option<Segment> {
    let link = state.links.get(link_hash)?;
    Some(Segment {
        link: link.clone(),
        meta: SegmentMeta {
            link_hash: *link_hash,
            evidences: state.evidences.get(link_hash).cloned().unwrap_or_default(),
        },
    })
}

impl StoreWriter for MemoryStore {
    fn create_link(&self, link: &Link) -> StoreResult<LinkHash> {
        link.validate()?;
        let link_hash = link.hash()?;

        let mut state = self.write_state()?;
        // Exact duplicates re-accept: same bytes, same hash, same entry.
        state.links.insert(link_hash, link.clone());
        state
            .maps
            .entry(link.map_id().to_string())
            .or_default()
            .insert(link_hash);

        tracing::debug!(link_hash = %link_hash.short_hex(), map_id = link.map_id(), "link created");
        self.publish(&StoreEvent::saved_links(link.clone()))?;
        Ok(link_hash)
    }

    fn add_evidence(&self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state
            .evidences
            .entry(*link_hash)
            .or_default()
            .add(evidence.clone())?;

        tracing::debug!(link_hash = %link_hash.short_hex(), backend = %evidence.backend, "evidence added");
        self.publish(&StoreEvent::saved_evidence(*link_hash, evidence.clone()))?;
        Ok(())
    }
}

impl StoreReader for MemoryStore {
    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>> {
        let state = self.read_state()?;
        Ok(materialize(&state, link_hash))
    }

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>> {
        let state = self.read_state()?;

        // A prev-link-hash constraint may match links outside the listed
        // maps' index entries, so it forces a full scan.
        let hashes: Vec<LinkHash> =
            if filter.map_ids.is_empty() || filter.prev_link_hash.is_some() {
                state.links.keys().copied().collect()
            } else {
                let mut union = HashSet::new();
                for map_id in &filter.map_ids {
                    if let Some(members) = state.maps.get(map_id) {
                        union.extend(members.iter().copied());
                    }
                }
                union.into_iter().collect()
            };

        let mut segments = Vec::new();
        for link_hash in hashes {
            if let Some(segment) = materialize(&state, &link_hash) {
                if filter.match_segment(&segment) {
                    segments.push(segment);
                }
            }
        }

        sort_segments(&mut segments);
        Ok(filter.pagination.paginate(segments))
    }

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>> {
        let state = self.read_state()?;

        let mut map_ids = Vec::with_capacity(state.maps.len());
        for (map_id, members) in &state.maps {
            let included = members
                .iter()
                .filter_map(|h| state.links.get(h))
                .any(|link| filter.match_link(link));
            if included {
                map_ids.push(map_id.clone());
            }
        }

        sort_map_ids(&mut map_ids);
        Ok(filter.pagination.paginate(map_ids))
    }

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        let state = self.read_state()?;
        Ok(state.evidences.get(link_hash).cloned())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let state = self.read_state()?;
        Ok(state.values.get(&hex::encode(key)).cloned())
    }

    fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.values.insert(hex::encode(key), value.to_vec());
        Ok(())
    }

    fn delete_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let mut state = self.write_state()?;
        Ok(state.values.remove(&hex::encode(key)))
    }
}

impl Adapter for MemoryStore {
    fn get_info(&self) -> StoreResult<StoreInfo> {
        Ok(StoreInfo {
            name: NAME.into(),
            description: DESCRIPTION.into(),
            version: self.config.version.clone(),
            commit: self.config.commit.clone(),
        })
    }

    fn new_batch(&self) -> StoreResult<Box<dyn Batch + '_>> {
        Ok(Box::new(BufferedBatch::new(self)))
    }

    fn add_event_channel(&self, sender: EventSender) {
        self.event_chans
            .write()
            .expect("event channel lock poisoned")
            .push(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc::sync_channel;

    fn store() -> MemoryStore {
        MemoryStore::default()
    }

    fn root(map_id: &str, process: &str) -> Link {
        Link::new_root(map_id, process, json!({}))
    }

    fn child(parent: &LinkHash, map_id: &str, process: &str) -> Link {
        let mut link = Link::new_root(map_id, process, json!({}));
        link.meta.prev_link_hash = Some(parent.to_hex());
        link
    }

    #[test]
    fn create_link_indexes_the_map() {
        let store = store();
        let hash = store.create_link(&root("m1", "p1")).unwrap();

        let segment = store.get_segment(&hash).unwrap().unwrap();
        assert_eq!(segment.meta.link_hash, hash);
        assert_eq!(segment.link.map_id(), "m1");

        let maps = store.get_map_ids(&MapFilter {
            pagination: weave_store::Pagination::new(0, 10),
            ..MapFilter::default()
        });
        assert_eq!(maps.unwrap(), ["m1"]);
    }

    #[test]
    fn create_link_rejects_invalid_links() {
        let store = store();
        let mut link = root("m1", "p1");
        link.meta.map_id.clear();
        let err = store.create_link(&link).unwrap_err();
        assert!(err.is_validation());
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_create_reaccepts() {
        let store = store();
        let link = root("m1", "p1");
        let h1 = store.create_link(&link).unwrap();
        let h2 = store.create_link(&link).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_segment_missing_is_none() {
        let store = store();
        let absent = LinkHash::from_hash([7; 32]);
        assert!(store.get_segment(&absent).unwrap().is_none());
    }

    #[test]
    fn find_segments_unions_listed_maps() {
        let store = store();
        store.create_link(&root("m1", "p")).unwrap();
        store.create_link(&root("m2", "p")).unwrap();
        store.create_link(&root("m3", "p")).unwrap();

        let found = store
            .find_segments(&SegmentFilter {
                map_ids: vec!["m1".into(), "m3".into()],
                pagination: weave_store::Pagination::new(0, 10),
                ..SegmentFilter::default()
            })
            .unwrap();
        let mut map_ids: Vec<_> = found.iter().map(|s| s.link.map_id()).collect();
        map_ids.sort();
        assert_eq!(map_ids, ["m1", "m3"]);
    }

    #[test]
    fn find_segments_with_prev_filter_scans_all_links() {
        let store = store();
        let parent = store.create_link(&root("m1", "p")).unwrap();
        store.create_link(&child(&parent, "m1", "p")).unwrap();

        // Roots only.
        let roots = store
            .find_segments(&SegmentFilter {
                map_ids: vec!["m1".into()],
                prev_link_hash: Some(String::new()),
                pagination: weave_store::Pagination::new(0, 10),
                ..SegmentFilter::default()
            })
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].meta.link_hash, parent);

        // Children of the parent.
        let children = store
            .find_segments(&SegmentFilter {
                prev_link_hash: Some(parent.to_hex()),
                pagination: weave_store::Pagination::new(0, 10),
                ..SegmentFilter::default()
            })
            .unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].link.prev_link_hash(), Some(parent.to_hex().as_str()));
    }

    #[test]
    fn get_map_ids_filters_on_member_process() {
        let store = store();
        store.create_link(&root("m1", "p1")).unwrap();
        store.create_link(&root("m2", "p2")).unwrap();

        let ids = store
            .get_map_ids(&MapFilter {
                process: Some("p2".into()),
                pagination: weave_store::Pagination::new(0, 10),
            })
            .unwrap();
        assert_eq!(ids, ["m2"]);
    }

    #[test]
    fn evidences_conflict_on_duplicate_pair() {
        let store = store();
        let hash = store.create_link(&root("m1", "p")).unwrap();

        store.add_evidence(&hash, &Evidence::new("b", "p")).unwrap();
        let err = store.add_evidence(&hash, &Evidence::new("b", "p")).unwrap_err();
        assert!(err.is_conflict());

        let evidences = store.get_evidences(&hash).unwrap().unwrap();
        assert_eq!(evidences.len(), 1);
    }

    #[test]
    fn get_evidences_missing_is_none() {
        let store = store();
        let absent = LinkHash::from_hash([9; 32]);
        assert!(store.get_evidences(&absent).unwrap().is_none());
    }

    #[test]
    fn key_value_roundtrip() {
        let store = store();
        assert!(store.get_value(b"k").unwrap().is_none());

        store.set_value(b"k", b"v").unwrap();
        assert_eq!(store.get_value(b"k").unwrap().unwrap(), b"v");

        let previous = store.delete_value(b"k").unwrap().unwrap();
        assert_eq!(previous, b"v");
        assert!(store.get_value(b"k").unwrap().is_none());
        assert!(store.delete_value(b"k").unwrap().is_none());
    }

    #[test]
    fn events_are_published_in_write_order() {
        let store = store();
        let (tx, rx) = sync_channel(8);
        store.add_event_channel(tx);

        let link = root("m1", "p");
        let hash = store.create_link(&link).unwrap();
        store.add_evidence(&hash, &Evidence::new("b", "p")).unwrap();

        assert_eq!(rx.recv().unwrap(), StoreEvent::saved_links(link));
        match rx.recv().unwrap() {
            StoreEvent::SavedEvidences(additions) => {
                assert_eq!(additions.len(), 1);
                assert!(additions.contains_key(&hash));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn concurrent_writers_and_readers_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0u8..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..25 {
                    let link = Link::new_root(
                        format!("m{i}"),
                        "p",
                        json!({ "writer": i, "seq": j }),
                    );
                    let hash = store.create_link(&link).unwrap();
                    assert!(store.get_segment(&hash).unwrap().is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().expect("writer thread panicked");
        }
        assert_eq!(store.len(), 100);
    }
}
