//! Write-event notification.
//!
//! Backends hold an ordered list of registered sinks and deliver one event
//! per accepted write, synchronously, in registration order. Sinks are
//! bounded synchronous channels, so a sink that stops draining applies
//! backpressure to writers; this keeps event order equal to write order
//! and lets tests observe write completion deterministically.
//!
//! Sinks must not call back into the adapter that delivered the event:
//! delivery happens inside the store's write critical section.

use std::collections::BTreeMap;
use std::sync::mpsc::SyncSender;

use serde::{Deserialize, Serialize};

use weave_types::{Evidence, Link, LinkHash};

/// A registered write-event sink.
pub type EventSender = SyncSender<StoreEvent>;

/// Notification of an accepted write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum StoreEvent {
    /// One or more links were saved atomically.
    SavedLinks(Vec<Link>),
    /// One or more evidences were added, keyed by link hash.
    SavedEvidences(BTreeMap<LinkHash, Evidence>),
}

impl StoreEvent {
    /// Event for a single saved link.
    pub fn saved_links(link: Link) -> Self {
        StoreEvent::SavedLinks(vec![link])
    }

    /// Event for a single saved evidence.
    pub fn saved_evidence(link_hash: LinkHash, evidence: Evidence) -> Self {
        let mut additions = BTreeMap::new();
        additions.insert(link_hash, evidence);
        StoreEvent::SavedEvidences(additions)
    }
}

/// Deliver an event to every sink in registration order.
///
/// A disconnected sink (receiver dropped) is skipped; a full sink blocks
/// the writer until it drains.
pub fn deliver(channels: &[EventSender], event: &StoreEvent) {
    for channel in channels {
        if channel.send(event.clone()).is_err() {
            tracing::debug!("store event sink disconnected, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn deliver_preserves_registration_order() {
        let (tx1, rx1) = sync_channel(1);
        let (tx2, rx2) = sync_channel(1);
        let event = StoreEvent::saved_links(Link::new_root("m", "p", json!({})));

        deliver(&[tx1, tx2], &event);

        assert_eq!(rx1.recv().unwrap(), event);
        assert_eq!(rx2.recv().unwrap(), event);
    }

    #[test]
    fn disconnected_sink_is_skipped() {
        let (tx1, rx1) = sync_channel(1);
        let (tx2, _) = sync_channel::<StoreEvent>(1);
        drop(rx1);
        let event = StoreEvent::saved_links(Link::new_root("m", "p", json!({})));

        // Must not panic or block.
        deliver(&[tx1, tx2.clone()], &event);
    }

    #[test]
    fn serde_tags_the_event_kind() {
        let link = Link::new_root("m", "p", json!({}));
        let value = serde_json::to_value(StoreEvent::saved_links(link)).unwrap();
        assert_eq!(value["type"], json!("SavedLinks"));
        assert!(value["details"].is_array());

        let hash = LinkHash::from_hash([1; 32]);
        let value =
            serde_json::to_value(StoreEvent::saved_evidence(hash, Evidence::new("b", "p")))
                .unwrap();
        assert_eq!(value["type"], json!("SavedEvidences"));
        assert!(value["details"][hash.to_hex().as_str()].is_object());
    }
}
