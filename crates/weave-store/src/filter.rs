//! Query predicates, ordering and pagination.
//!
//! A segment matches a filter iff every *set* field matches; an unset field
//! imposes no constraint. Orderings are total and deterministic so that
//! every backend returns identical pages for identical input.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use weave_types::{Link, Segment};

/// Post-sort slicing: `sorted[offset .. offset + limit]`, clamped.
///
/// `limit == 0` yields an empty page; unbounded queries are the caller's
/// concern (pass an explicit large limit).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Slice an already-sorted result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.limit == 0 || self.offset >= items.len() {
            return Vec::new();
        }
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

/// Predicate over segments.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentFilter {
    /// Restrict to these maps; empty means unrestricted.
    pub map_ids: Vec<String>,
    pub process: Option<String>,
    /// `None` = no constraint; `Some("")` = roots only; `Some(h)` =
    /// children of `h`.
    pub prev_link_hash: Option<String>,
    /// All-of semantics: a segment must carry every listed tag.
    pub tags: Vec<String>,
    /// Restrict to these hashes (hex); empty means unrestricted.
    pub link_hashes: Vec<String>,
    pub pagination: Pagination,
}

impl SegmentFilter {
    /// Whether a segment satisfies every set field.
    pub fn match_segment(&self, segment: &Segment) -> bool {
        if !self.link_hashes.is_empty() {
            let hex = segment.meta.link_hash.to_hex();
            if !self.link_hashes.iter().any(|h| *h == hex) {
                return false;
            }
        }
        self.match_link(&segment.link)
    }

    /// The link-level part of the predicate.
    pub fn match_link(&self, link: &Link) -> bool {
        if !self.map_ids.is_empty() && !self.map_ids.iter().any(|m| m == link.map_id()) {
            return false;
        }
        if let Some(process) = &self.process {
            if link.process() != process {
                return false;
            }
        }
        if let Some(prev) = &self.prev_link_hash {
            match (prev.is_empty(), link.prev_link_hash()) {
                (true, None) => {}
                (false, Some(actual)) if actual == prev => {}
                _ => return false,
            }
        }
        if !self.tags.iter().all(|tag| link.has_tag(tag)) {
            return false;
        }
        true
    }
}

/// Predicate over maps.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapFilter {
    pub process: Option<String>,
    pub pagination: Pagination,
}

impl MapFilter {
    /// Whether a member link qualifies its map for inclusion.
    pub fn match_link(&self, link: &Link) -> bool {
        match &self.process {
            Some(process) => link.process() == process,
            None => true,
        }
    }
}

/// Sort segments by `(priority desc, linkHash asc)`; missing priority
/// sorts last. Total and identical across backends.
pub fn sort_segments(segments: &mut [Segment]) {
    segments.sort_by(|a, b| {
        compare_priority(a.link.meta.priority, b.link.meta.priority)
            .then_with(|| a.meta.link_hash.cmp(&b.meta.link_hash))
    });
}

fn compare_priority(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Convenience used by map-ID queries: pagination over a hash identifies
/// nothing, so map listings sort lexicographically before slicing.
pub fn sort_map_ids(map_ids: &mut Vec<String>) {
    map_ids.sort();
    map_ids.dedup();
}
