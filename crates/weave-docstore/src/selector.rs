//! Translation of store filters into document-database queries.
//!
//! The output shape follows the Mango `_find` API: a `selector` object
//! keyed by dotted document paths, `limit`/`skip` pagination, and a `sort`
//! array. The serialized JSON of these types is the query wire format.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use weave_store::{MapFilter, SegmentFilter};

/// `docType` value of link documents.
pub const OBJECT_TYPE_LINK: &str = "link";

/// `docType` value of map-header documents.
pub const OBJECT_TYPE_MAP: &str = "map";

/// Selector over link documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSelector {
    #[serde(rename = "docType")]
    pub object_type: String,
    #[serde(rename = "link.meta.prevLinkHash", skip_serializing_if = "Option::is_none")]
    pub prev_link_hash: Option<PrevLinkHashMatch>,
    #[serde(rename = "link.meta.process", skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(rename = "link.meta.mapId", skip_serializing_if = "Option::is_none")]
    pub map_ids: Option<InClause>,
    #[serde(rename = "link.meta.tags", skip_serializing_if = "Option::is_none")]
    pub tags: Option<AllClause>,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub link_hashes: Option<InClause>,
}

/// `{"$in": [...]}` — the document value must be one of the listed values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InClause {
    #[serde(rename = "$in")]
    pub values: Vec<String>,
}

/// `{"$all": [...]}` — the document array must contain every listed value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllClause {
    #[serde(rename = "$all")]
    pub values: Vec<String>,
}

/// Match on the previous-link-hash field: either an existence check (for
/// root links) or an exact value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrevLinkHashMatch {
    #[serde(rename = "$exists", skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(rename = "$eq", skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
}

/// A full link query: selector, pushed-down pagination and sort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkQuery {
    pub selector: LinkSelector,
    pub limit: usize,
    pub skip: usize,
    pub sort: Vec<Value>,
}

/// Selector over map-header documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSelector {
    #[serde(rename = "docType")]
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

/// A full map query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapQuery {
    pub selector: MapSelector,
    pub limit: usize,
    pub skip: usize,
    pub sort: Vec<Value>,
}

/// Translate a segment filter into a link query.
pub fn segment_query(filter: &SegmentFilter) -> LinkQuery {
    let mut selector = LinkSelector {
        object_type: OBJECT_TYPE_LINK.into(),
        ..LinkSelector::default()
    };

    if let Some(prev) = &filter.prev_link_hash {
        selector.prev_link_hash = Some(if prev.is_empty() {
            PrevLinkHashMatch {
                exists: Some(false),
                equals: None,
            }
        } else {
            PrevLinkHashMatch {
                exists: None,
                equals: Some(prev.clone()),
            }
        });
    }
    if let Some(process) = &filter.process {
        selector.process = Some(process.clone());
    }
    if !filter.map_ids.is_empty() {
        selector.map_ids = Some(InClause {
            values: filter.map_ids.clone(),
        });
    }
    if !filter.tags.is_empty() {
        selector.tags = Some(AllClause {
            values: filter.tags.clone(),
        });
    }
    if !filter.link_hashes.is_empty() {
        selector.link_hashes = Some(InClause {
            values: filter.link_hashes.clone(),
        });
    }

    LinkQuery {
        selector,
        limit: filter.pagination.limit,
        skip: filter.pagination.offset,
        // Priority descending (missing last), then hash ascending: the
        // hex-encoded _id orders exactly like the raw hash bytes.
        sort: vec![
            json!({"link.meta.priority": "desc"}),
            json!({"_id": "asc"}),
        ],
    }
}

/// Translate a map filter into a map query.
pub fn map_query(filter: &MapFilter) -> MapQuery {
    MapQuery {
        selector: MapSelector {
            object_type: OBJECT_TYPE_MAP.into(),
            process: filter.process.clone(),
        },
        limit: filter.pagination.limit,
        skip: filter.pagination.offset,
        sort: vec![json!({"_id": "asc"})],
    }
}
