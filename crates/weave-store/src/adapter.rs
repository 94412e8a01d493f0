//! The uniform storage contract.
//!
//! All implementations must satisfy these invariants:
//! - Links are immutable once written; the stored link always hashes to its
//!   key (`linkHash(s) == hash(s.link)`).
//! - Not-found is `Ok(None)`, never an error.
//! - `create_link` is idempotent on exact duplicates (the reference choice
//!   is to re-accept; each backend documents its own).
//! - Evidence sets are append-only and unique per `(backend, provider)`.
//! - Query ordering and pagination follow [`crate::filter`] exactly, so
//!   identical input sequences produce identical pages on every backend.
//! - One event per accepted write, delivered in write order.

use serde::{Deserialize, Serialize};

use weave_types::{Evidence, Evidences, Link, LinkHash, Segment};

use crate::error::StoreResult;
use crate::event::EventSender;
use crate::filter::{MapFilter, SegmentFilter};

/// Backend identity, surfaced at the root of the HTTP projection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    pub commit: String,
}

/// Read boundary: segment and map queries.
pub trait StoreReader {
    /// Fetch one segment by hash. `Ok(None)` when absent.
    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>>;

    /// Query segments, sorted by `(priority desc, linkHash asc)` and
    /// paginated.
    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>>;

    /// Query map IDs, sorted lexicographically and paginated.
    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>>;

    /// Fetch the evidences of a link. `Ok(None)` when none were recorded.
    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>>;
}

/// Write boundary: link and evidence appends.
pub trait StoreWriter {
    /// Validate, hash and persist a link; returns its hash.
    fn create_link(&self, link: &Link) -> StoreResult<LinkHash>;

    /// Attach an evidence to a link; fails on a duplicate
    /// `(backend, provider)` pair.
    fn add_evidence(&self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()>;
}

/// Flat key-value side channel, independent of segment storage.
pub trait KeyValueStore {
    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Delete a key, returning the previous value if any.
    fn delete_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;
}

/// The full adapter contract implemented by every backend.
pub trait Adapter: StoreReader + StoreWriter + KeyValueStore + Send + Sync {
    /// Backend identity.
    fn get_info(&self) -> StoreResult<StoreInfo>;

    /// Open a buffered batch over this adapter.
    fn new_batch(&self) -> StoreResult<Box<dyn Batch + '_>>;

    /// Register a write-event sink. Sinks receive every subsequent
    /// accepted write, in registration order.
    fn add_event_channel(&self, sender: EventSender);
}

/// A transactional overlay over a base adapter.
///
/// Reads see the overlay: everything staged in the batch plus everything
/// already in the base. Writes never touch the base until [`Batch::write`],
/// which replays the staged operations in issue order and stops at the
/// first error; already-applied operations remain applied (no rollback).
pub trait Batch: Send {
    /// Stage a link; visible to this batch's reads immediately.
    fn create_link(&mut self, link: &Link) -> StoreResult<LinkHash>;

    /// Stage an evidence; duplicates are detected against the overlay
    /// (base plus staged) at stage time.
    fn add_evidence(&mut self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()>;

    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>>;

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>>;

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>>;

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>>;

    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set_value(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    fn delete_value(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Replay the staged operations against the base adapter in issue
    /// order. The batch is spent afterwards, whether or not it succeeded.
    fn write(&mut self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_info_serializes_with_plain_field_names() {
        let info = StoreInfo {
            name: "memory".into(),
            description: "reference store".into(),
            version: "0.1.0".into(),
            commit: "abc123".into(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["name"], "memory");
        assert_eq!(value["commit"], "abc123");
        let parsed: StoreInfo = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, info);
    }
}
