use serde::{Deserialize, Serialize};

use weave_types::{Evidences, Link, LinkHash};

use crate::selector::{OBJECT_TYPE_LINK, OBJECT_TYPE_MAP};

/// A stored document.
///
/// One shape covers all collections: link and map-header documents carry a
/// `docType` tag; evidence and value documents live in their own
/// collections and need none. Absent fields are omitted from the JSON so
/// selector existence checks see the same shape the original documents had.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "docType", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    /// Map-header field: the process of the map's first link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidences: Option<Evidences>,
    /// Value documents store bytes hex-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Document {
    /// A link document, keyed by the link's hex hash.
    pub fn for_link(link_hash: &LinkHash, link: Link) -> Self {
        Self {
            id: link_hash.to_hex(),
            doc_type: Some(OBJECT_TYPE_LINK.into()),
            link: Some(link),
            ..Self::default()
        }
    }

    /// A map-header document, keyed by the map ID.
    pub fn for_map(map_id: &str, process: &str) -> Self {
        Self {
            id: map_id.into(),
            doc_type: Some(OBJECT_TYPE_MAP.into()),
            process: Some(process.into()),
            ..Self::default()
        }
    }

    /// An evidence document, keyed by the link's hex hash.
    pub fn for_evidences(link_hash: &LinkHash, evidences: Evidences) -> Self {
        Self {
            id: link_hash.to_hex(),
            evidences: Some(evidences),
            ..Self::default()
        }
    }

    /// A value document, keyed by the hex-encoded key.
    pub fn for_value(key: &[u8], value: &[u8]) -> Self {
        Self {
            id: hex::encode(key),
            value: Some(hex::encode(value)),
            ..Self::default()
        }
    }
}
