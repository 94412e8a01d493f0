//! Scriptable adapter for failure-path tests.
//!
//! [`MockAdapter`] implements the full contract over a naive linear store,
//! counts calls per operation, and can be scripted to fail: everything
//! (for HTTP 500-path tests) or `create_link` after a quota (for batch
//! partial-replay tests).

use std::sync::Mutex;

use weave_batch::BufferedBatch;
use weave_store::filter::sort_map_ids;
use weave_store::{
    event, sort_segments, Adapter, Batch, EventSender, KeyValueStore, MapFilter, SegmentFilter,
    StoreError, StoreEvent, StoreInfo, StoreReader, StoreResult, StoreWriter,
};
use weave_types::{Evidence, Evidences, Link, LinkHash, Segment, SegmentMeta};

/// Number of calls made to each operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_info: usize,
    pub create_link: usize,
    pub get_segment: usize,
    pub find_segments: usize,
    pub get_map_ids: usize,
    pub add_evidence: usize,
    pub get_evidences: usize,
    pub get_value: usize,
    pub set_value: usize,
    pub delete_value: usize,
}

#[derive(Default)]
struct MockState {
    links: Vec<(LinkHash, Link)>,
    evidences: Vec<(LinkHash, Evidences)>,
    values: Vec<(Vec<u8>, Vec<u8>)>,
}

/// A mock store with call counting and failure injection.
pub struct MockAdapter {
    state: Mutex<MockState>,
    counts: Mutex<CallCounts>,
    event_chans: Mutex<Vec<EventSender>>,
    fail_all: bool,
    create_link_quota: Mutex<Option<usize>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            counts: Mutex::new(CallCounts::default()),
            event_chans: Mutex::new(Vec::new()),
            fail_all: false,
            create_link_quota: Mutex::new(None),
        }
    }

    /// A mock whose every operation fails with a backend error.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    /// Allow only `quota` successful `create_link` calls; later ones fail.
    pub fn with_create_link_quota(self, quota: usize) -> Self {
        *self.create_link_quota.lock().expect("mock lock poisoned") = Some(quota);
        self
    }

    pub fn call_counts(&self) -> CallCounts {
        self.counts.lock().expect("mock lock poisoned").clone()
    }

    fn count(&self, bump: impl FnOnce(&mut CallCounts)) {
        bump(&mut self.counts.lock().expect("mock lock poisoned"));
    }

    fn check_failure(&self) -> StoreResult<()> {
        if self.fail_all {
            return Err(StoreError::Backend("mock backend failure".into()));
        }
        Ok(())
    }

    fn publish(&self, event: &StoreEvent) {
        let chans = self.event_chans.lock().expect("mock lock poisoned");
        event::deliver(&chans, event);
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreWriter for MockAdapter {
    fn create_link(&self, link: &Link) -> StoreResult<LinkHash> {
        self.count(|c| c.create_link += 1);
        self.check_failure()?;

        let mut quota = self.create_link_quota.lock().expect("mock lock poisoned");
        if let Some(remaining) = quota.as_mut() {
            if *remaining == 0 {
                return Err(StoreError::Backend("create_link quota exhausted".into()));
            }
            *remaining -= 1;
        }
        drop(quota);

        link.validate()?;
        let link_hash = link.hash()?;
        let mut state = self.state.lock().expect("mock lock poisoned");
        if !state.links.iter().any(|(h, _)| *h == link_hash) {
            state.links.push((link_hash, link.clone()));
        }
        drop(state);

        self.publish(&StoreEvent::saved_links(link.clone()));
        Ok(link_hash)
    }

    fn add_evidence(&self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()> {
        self.count(|c| c.add_evidence += 1);
        self.check_failure()?;

        let mut state = self.state.lock().expect("mock lock poisoned");
        match state.evidences.iter_mut().find(|(h, _)| h == link_hash) {
            Some((_, evidences)) => evidences.add(evidence.clone())?,
            None => {
                let mut evidences = Evidences::new();
                evidences.add(evidence.clone())?;
                state.evidences.push((*link_hash, evidences));
            }
        }
        drop(state);

        self.publish(&StoreEvent::saved_evidence(*link_hash, evidence.clone()));
        Ok(())
    }
}

impl StoreReader for MockAdapter {
    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>> {
        self.count(|c| c.get_segment += 1);
        self.check_failure()?;

        let state = self.state.lock().expect("mock lock poisoned");
        Ok(state
            .links
            .iter()
            .find(|(h, _)| h == link_hash)
            .map(|(h, link)| Segment {
                link: link.clone(),
                meta: SegmentMeta {
                    link_hash: *h,
                    evidences: state
                        .evidences
                        .iter()
                        .find(|(eh, _)| eh == h)
                        .map(|(_, e)| e.clone())
                        .unwrap_or_default(),
                },
            }))
    }

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>> {
        self.count(|c| c.find_segments += 1);
        self.check_failure()?;

        let state = self.state.lock().expect("mock lock poisoned");
        let mut segments: Vec<Segment> = state
            .links
            .iter()
            .map(|(h, link)| Segment {
                link: link.clone(),
                meta: SegmentMeta {
                    link_hash: *h,
                    evidences: state
                        .evidences
                        .iter()
                        .find(|(eh, _)| eh == h)
                        .map(|(_, e)| e.clone())
                        .unwrap_or_default(),
                },
            })
            .filter(|s| filter.match_segment(s))
            .collect();

        sort_segments(&mut segments);
        Ok(filter.pagination.paginate(segments))
    }

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>> {
        self.count(|c| c.get_map_ids += 1);
        self.check_failure()?;

        let state = self.state.lock().expect("mock lock poisoned");
        let mut map_ids: Vec<String> = state
            .links
            .iter()
            .filter(|(_, link)| filter.match_link(link))
            .map(|(_, link)| link.map_id().to_string())
            .collect();

        sort_map_ids(&mut map_ids);
        Ok(filter.pagination.paginate(map_ids))
    }

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        self.count(|c| c.get_evidences += 1);
        self.check_failure()?;

        let state = self.state.lock().expect("mock lock poisoned");
        Ok(state
            .evidences
            .iter()
            .find(|(h, _)| h == link_hash)
            .map(|(_, e)| e.clone()))
    }
}

impl KeyValueStore for MockAdapter {
    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.count(|c| c.get_value += 1);
        self.check_failure()?;

        let state = self.state.lock().expect("mock lock poisoned");
        Ok(state
            .values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.count(|c| c.set_value += 1);
        self.check_failure()?;

        let mut state = self.state.lock().expect("mock lock poisoned");
        match state.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_vec(),
            None => state.values.push((key.to_vec(), value.to_vec())),
        }
        Ok(())
    }

    fn delete_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.count(|c| c.delete_value += 1);
        self.check_failure()?;

        let mut state = self.state.lock().expect("mock lock poisoned");
        match state.values.iter().position(|(k, _)| k == key) {
            Some(index) => Ok(Some(state.values.remove(index).1)),
            None => Ok(None),
        }
    }
}

impl Adapter for MockAdapter {
    fn get_info(&self) -> StoreResult<StoreInfo> {
        self.count(|c| c.get_info += 1);
        self.check_failure()?;

        Ok(StoreInfo {
            name: "mock".into(),
            description: "Weave mock store".into(),
            version: "0.0.0".into(),
            commit: "0000000".into(),
        })
    }

    fn new_batch(&self) -> StoreResult<Box<dyn Batch + '_>> {
        Ok(Box::new(BufferedBatch::new(self)))
    }

    fn add_event_channel(&self, sender: EventSender) {
        self.event_chans
            .lock()
            .expect("mock lock poisoned")
            .push(sender);
    }
}
