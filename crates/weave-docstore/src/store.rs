use std::sync::{Mutex, RwLock};

use weave_batch::BufferedBatch;
use weave_store::{
    event, Adapter, Batch, EventSender, KeyValueStore, MapFilter, SegmentFilter, StoreError,
    StoreEvent, StoreInfo, StoreReader, StoreResult, StoreWriter,
};
use weave_types::{Evidence, Evidences, Link, LinkHash, Segment, SegmentMeta};

use crate::database::{DocumentDatabase, MemoryDocumentDb};
use crate::document::Document;
use crate::selector::{map_query, segment_query};

/// Name reported in the store's information.
pub const NAME: &str = "docstore";

/// Description reported in the store's information.
pub const DESCRIPTION: &str = "Weave document-database store";

/// Configuration options for the store.
#[derive(Clone, Debug, Default)]
pub struct DocStoreConfig {
    pub version: String,
    pub commit: String,
}

/// Document-database adapter over three collections: links and map headers
/// (tagged by `docType`), evidences, and values.
///
/// Read-modify-write sequences (evidence appends, map-header creation) are
/// serialized by a store-level write lock; reads go straight to the
/// database.
pub struct DocStore<D: DocumentDatabase> {
    links: D,
    evidences: D,
    values: D,
    config: DocStoreConfig,
    write_lock: Mutex<()>,
    event_chans: RwLock<Vec<EventSender>>,
}

impl DocStore<MemoryDocumentDb> {
    /// A store over in-memory collections, for tests and embedding.
    pub fn in_memory(config: DocStoreConfig) -> Self {
        Self::new(
            MemoryDocumentDb::new(),
            MemoryDocumentDb::new(),
            MemoryDocumentDb::new(),
            config,
        )
    }
}

impl<D: DocumentDatabase> DocStore<D> {
    pub fn new(links: D, evidences: D, values: D, config: DocStoreConfig) -> Self {
        Self {
            links,
            evidences,
            values,
            config,
            write_lock: Mutex::new(()),
            event_chans: RwLock::new(Vec::new()),
        }
    }

    fn write_guard(&self) -> StoreResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Internal("store write lock poisoned".into()))
    }

    fn publish(&self, event: &StoreEvent) -> StoreResult<()> {
        let chans = self
            .event_chans
            .read()
            .map_err(|_| StoreError::Internal("event channel lock poisoned".into()))?;
        event::deliver(&chans, event);
        Ok(())
    }

    fn segment_from_document(&self, document: Document) -> StoreResult<Option<Segment>> {
        let Some(link) = document.link else {
            return Ok(None);
        };
        let link_hash = LinkHash::from_hex(&document.id).map_err(StoreError::Validation)?;
        let evidences = self
            .evidences
            .get(&document.id)?
            .and_then(|doc| doc.evidences)
            .unwrap_or_default();
        Ok(Some(Segment {
            link,
            meta: SegmentMeta {
                link_hash,
                evidences,
            },
        }))
    }
}

impl<D: DocumentDatabase> StoreWriter for DocStore<D> {
    fn create_link(&self, link: &Link) -> StoreResult<LinkHash> {
        link.validate()?;
        let link_hash = link.hash()?;

        let _guard = self.write_guard()?;
        self.links
            .put(&Document::for_link(&link_hash, link.clone()))?;

        // The map header is created by the map's first link.
        if self.links.get(link.map_id())?.is_none() {
            self.links
                .put(&Document::for_map(link.map_id(), link.process()))?;
        }

        tracing::debug!(link_hash = %link_hash.short_hex(), map_id = link.map_id(), "link document stored");
        self.publish(&StoreEvent::saved_links(link.clone()))?;
        Ok(link_hash)
    }

    fn add_evidence(&self, link_hash: &LinkHash, evidence: &Evidence) -> StoreResult<()> {
        let _guard = self.write_guard()?;

        let id = link_hash.to_hex();
        let mut evidences = self
            .evidences
            .get(&id)?
            .and_then(|doc| doc.evidences)
            .unwrap_or_default();
        evidences.add(evidence.clone())?;
        self.evidences
            .put(&Document::for_evidences(link_hash, evidences))?;

        self.publish(&StoreEvent::saved_evidence(*link_hash, evidence.clone()))?;
        Ok(())
    }
}

impl<D: DocumentDatabase> StoreReader for DocStore<D> {
    fn get_segment(&self, link_hash: &LinkHash) -> StoreResult<Option<Segment>> {
        match self.links.get(&link_hash.to_hex())? {
            Some(document) => self.segment_from_document(document),
            None => Ok(None),
        }
    }

    fn find_segments(&self, filter: &SegmentFilter) -> StoreResult<Vec<Segment>> {
        if filter.pagination.limit == 0 {
            return Ok(Vec::new());
        }

        let query = serde_json::to_value(segment_query(filter))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut segments = Vec::new();
        for document in self.links.find(&query)? {
            if let Some(segment) = self.segment_from_document(document)? {
                segments.push(segment);
            }
        }
        Ok(segments)
    }

    fn get_map_ids(&self, filter: &MapFilter) -> StoreResult<Vec<String>> {
        if filter.pagination.limit == 0 {
            return Ok(Vec::new());
        }

        let query = serde_json::to_value(map_query(filter))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(self
            .links
            .find(&query)?
            .into_iter()
            .map(|document| document.id)
            .collect())
    }

    fn get_evidences(&self, link_hash: &LinkHash) -> StoreResult<Option<Evidences>> {
        Ok(self
            .evidences
            .get(&link_hash.to_hex())?
            .and_then(|doc| doc.evidences))
    }
}

impl<D: DocumentDatabase> KeyValueStore for DocStore<D> {
    fn get_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.values.get(&hex::encode(key))? {
            Some(document) => decode_value(document).map(Some),
            None => Ok(None),
        }
    }

    fn set_value(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.values.put(&Document::for_value(key, value))
    }

    fn delete_value(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.values.delete(&hex::encode(key))? {
            Some(document) => decode_value(document).map(Some),
            None => Ok(None),
        }
    }
}

fn decode_value(document: Document) -> StoreResult<Vec<u8>> {
    let encoded = document
        .value
        .ok_or_else(|| StoreError::Internal("value document without value".into()))?;
    hex::decode(&encoded).map_err(|e| StoreError::Internal(e.to_string()))
}

impl<D: DocumentDatabase> Adapter for DocStore<D> {
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
