//! Buffered batch: a transactional overlay over any adapter.
//!
//! A [`BufferedBatch`] wraps a base [`Adapter`] and presents the same
//! operation surface plus [`Batch::write`]. Reads see the overlay — writes
//! staged inside the batch plus everything already in the base — while the
//! base remains untouched until `write()` replays the staged operations in
//! issue order. Replay stops at the first error and already-applied
//! operations remain applied: the batch does not promise rollback.
//!
//! Concurrent batches over the same base are independent and do not see
//! each other's staged writes.

use std::collections::{BTreeMap, HashMap};

use weave_store::{
    sort_segments, Adapter, Batch, MapFilter, Pagination, SegmentFilter, StoreResult,
};
use weave_types::{Evidence, Evidences, Link, LinkHash, Segment, SegmentMeta};

/// A staged operation, recorded in issue order for replay.
#[derive(Clone, Debug)]
enum StagedOp {
    CreateLink(Link),
    AddEvidence(LinkHash, Evidence),
    SetValue(Vec<u8>, Vec<u8>),
    DeleteValue(Vec<u8>),
}

/// Buffered batch over a base adapter.
pub struct BufferedBatch<'a> {
    base: &'a dyn Adapter,
    ops: Vec<StagedOp>,
    /// Staged links by hash, for overlay reads.
    links: HashMap<LinkHash, Link>,
    /// Staged evidences by hash, in stage order.
    evidences: HashMap<LinkHash, Evidences>,
    /// Staged key-value overlay; `None` marks a staged delete.
    values: HashMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> BufferedBatch<'a> {
    pub fn new(base: &'a dyn Adapter) -> Self {
        Self {
            base,
            ops: Vec::new(),
            links: HashMap::new(),
            evidences: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Number of staged operations awaiting replay.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Base evidences merged with staged ones. Staged duplicates were
    /// rejected at stage time, so the merge itself never conflicts; if the
    /// base gained a colliding pair after staging, the base entry wins.
    fn overlay_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        let base = self.base.get_evidences(link_hash)?;
        let staged = self.evidences.get(link_hash);
        match (base, staged) {
            (None, None) => Ok(None),
            (base, staged) => {
                let mut merged = base.unwrap_or_default();
                if let Some(staged) = staged {
                    for evidence in staged.iter() {
                        if merged.find(&evidence.backend, &evidence.provider).is_none() {
                            merged
                                .add(evidence.clone())
                                .expect("merge collision already filtered");
                        }
                    }
                }
                Ok(Some(merged))
            }
        }
    }

    /// Materialize a staged link as a segment with overlay evidences.
    fn overlay_segment(&self, link_hash: &LinkHash, link: &Link) -> StoreResult<Segment> {
        Ok(Segment {
            link: link.clone(),
            meta: SegmentMeta {
                link_hash: *link_hash,
                evidences: self.overlay_evidences(link_hash)?.unwrap_or_default(),
            },
        })
    }
}

/// Pagination that keeps every result, for fetching the base side of an
/// overlay query before combining, sorting and slicing locally.
fn unbounded() -> Pagination {
    Pagination::new(0, usize::MAX)
}

impl Batch for BufferedBatch<'_> {
    fn create_link(&mut self, link: &Link) -> StoreResult<LinkHash> {
        link.validate()?;
        let link_hash = link.hash()?;
        self.ops.push(StagedOp::CreateLink(link.clone()));
        self.links.insert(link_hash, link.clone());
        Ok(link_hash)
    }

    fn add_evidence(&mut self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()> {
        // Duplicate detection runs against the overlay at stage time.
        let mut overlay = self.overlay_evidences(link_hash)?.unwrap_or_default();
        overlay.add(evidence.clone())?;

        self.ops
            .push(StagedOp::AddEvidence(*link_hash, evidence.clone()));
        self.evidences
            .entry(*link_hash)
            .or_default()
            .add(evidence.clone())?;
        Ok(())
    }

    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>> {
        match self.links.get(link_hash) {
            Some(link) => Ok(Some(self.overlay_segment(link_hash, link)?)),
            None => self.base.get_segment(link_hash),
        }
    }

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>> {
        let mut base_filter = filter.clone();
        base_filter.pagination = unbounded();

        let mut by_hash: BTreeMap<LinkHash, Segment> = self
            .base
            .find_segments(&base_filter)?
            .into_iter()
            .map(|s| (s.meta.link_hash, s))
            .collect();

        // Staged segments are filtered identically and win on collision.
        for (link_hash, link) in &self.links {
            let segment = self.overlay_segment(link_hash, link)?;
            if filter.match_segment(&segment) {
                by_hash.insert(*link_hash, segment);
            }
        }

        let mut combined: Vec<Segment> = by_hash.into_values().collect();
        sort_segments(&mut combined);
        Ok(filter.pagination.paginate(combined))
    }

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>> {
        let mut base_filter = filter.clone();
        base_filter.pagination = unbounded();

        let mut map_ids = self.base.get_map_ids(&base_filter)?;
        for link in self.links.values() {
            if filter.match_link(link) {
                map_ids.push(link.map_id().to_string());
            }
        }

        weave_store::filter::sort_map_ids(&mut map_ids);
        Ok(filter.pagination.paginate(map_ids))
    }

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        self.overlay_evidences(link_hash)
    }

    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.values.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get_value(key),
        }
    }

    fn set_value(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.ops
            .push(StagedOp::SetValue(key.to_vec(), value.to_vec()));
        self.values.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete_value(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let previous = self.get_value(key)?;
        self.ops.push(StagedOp::DeleteValue(key.to_vec()));
        self.values.insert(key.to_vec(), None);
        Ok(previous)
    }

    fn write(&mut self) -> StoreResult<()> {
        let ops = std::mem::take(&mut self.ops);
        tracing::debug!(staged = ops.len(), "replaying batch against base");

        for op in ops {
            match op {
                StagedOp::CreateLink(link) => {
                    self.base.create_link(&link)?;
                }
                StagedOp::AddEvidence(link_hash, evidence) => {
                    self.base.add_evidence(&link_hash, &evidence)?;
                }
                StagedOp::SetValue(key, value) => {
                    self.base.set_value(&key, &value)?;
                }
                StagedOp::DeleteValue(key) => {
                    self.base.delete_value(&key)?;
                }
            }
        }

        self.links.clear();
        self.evidences.clear();
        self.values.clear();
        Ok(())
    }
}
