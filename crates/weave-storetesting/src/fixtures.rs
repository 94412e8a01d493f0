//! Link fixtures shared by the conformance suite and backend tests.

use serde_json::{json, Value};

use weave_types::{Link, LinkHash, LinkMeta, LinkRef, Segment};

/// Builder for test links.
///
/// Fixtures are fully deterministic: the same builder calls always produce
/// the same link, and therefore the same hash, on every backend and run.
#[derive(Clone, Debug)]
pub struct TestLinkBuilder {
    link: Link,
}

impl TestLinkBuilder {
    pub fn new(map_id: &str, process: &str) -> Self {
        Self {
            link: Link {
                state: json!({}),
                meta: LinkMeta {
                    map_id: map_id.into(),
                    process: process.into(),
                    ..LinkMeta::default()
                },
            },
        }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.link.state = state;
        self
    }

    pub fn with_prev(self, parent: &LinkHash) -> Self {
        self.with_prev_hex(parent.to_hex())
    }

    pub fn with_prev_hex(mut self, prev: impl Into<String>) -> Self {
        self.link.meta.prev_link_hash = Some(prev.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link.meta.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.link.meta.priority = Some(priority);
        self
    }

    pub fn with_ref(mut self, reference: LinkRef) -> Self {
        self.link.meta.refs.get_or_insert_with(Vec::new).push(reference);
        self
    }

    pub fn build(self) -> Link {
        self.link
    }

    /// Build the link's segment projection.
    pub fn segmentify(self) -> Segment {
        Segment::from_link(self.link).expect("fixture link should hash")
    }
}

/// A root link for the given map and process, with a distinguishing state.
pub fn root_link(map_id: &str, process: &str) -> Link {
    TestLinkBuilder::new(map_id, process)
        .with_state(json!({ "root": map_id }))
        .build()
}

/// A child of the given parent, in the same map and process.
pub fn child_link(parent: &LinkHash, map_id: &str, process: &str) -> Link {
    TestLinkBuilder::new(map_id, process)
        .with_prev(parent)
        .with_state(json!({ "child_of": parent.to_hex() }))
        .build()
}

/// `n` links in one map with distinct priorities `0.0 .. n as f64`.
pub fn distinct_priority_links(map_id: &str, process: &str, n: usize) -> Vec<Link> {
    (0..n)
        .map(|i| {
            TestLinkBuilder::new(map_id, process)
                .with_state(json!({ "index": i }))
                .with_priority(i as f64)
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_is_deterministic() {
        let a = TestLinkBuilder::new("m", "p").with_priority(2.0).build();
        let b = TestLinkBuilder::new("m", "p").with_priority(2.0).build();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn distinct_priorities_hash_differently() {
        let links = distinct_priority_links("m", "p", 3);
        let hashes: Vec<_> = links.iter().map(|l| l.hash().unwrap()).collect();
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
    }

    #[test]
    fn child_links_back_to_parent() {
        let parent = root_link("m", "p").hash().unwrap();
        let child = child_link(&parent, "m", "p");
        assert_eq!(child.prev_link_hash(), Some(parent.to_hex().as_str()));
        assert!(!child.is_root());
    }
}
