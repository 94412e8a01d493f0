use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical;
use crate::error::ValidationError;
use crate::hash::LinkHash;
use crate::segment::Segment;

const LINK_HASH_DOMAIN: &[u8] = b"weave-link-v1:";

/// The immutable unit of content.
///
/// A link carries an opaque domain payload (`state`) and the metadata that
/// places it in a map: the map it belongs to, the workflow process that
/// produced it, and an optional hash link to its predecessor. A link with no
/// predecessor is the *root* of its map.
///
/// Links are created once and never mutated; their identity is the BLAKE3
/// hash of their canonical JSON form (see [`Link::hash`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Opaque domain payload.
    #[serde(default)]
    pub state: Value,
    /// Placement and workflow metadata.
    pub meta: LinkMeta,
}

/// Metadata attached to a [`Link`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMeta {
    /// The chain this link belongs to.
    #[serde(default)]
    pub map_id: String,
    /// Logical workflow name.
    #[serde(default)]
    pub process: String,
    /// Hex hash of the previous link; absent (or empty) on a map root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_link_hash: Option<String>,
    /// Ordered tag sequence. Duplicates are preserved in storage but
    /// queries treat the sequence as a set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Sort priority; links without one sort last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    /// References to segments in other maps or processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<LinkRef>>,
}

/// A reference carried by a link: either a full embedded segment, or a
/// `(process, linkHash)` pair. Any other shape is rejected at ingress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<Box<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_hash: Option<String>,
}

impl Link {
    /// Build a root link for a new map.
    pub fn new_root(map_id: impl Into<String>, process: impl Into<String>, state: Value) -> Self {
        Self {
            state,
            meta: LinkMeta {
                map_id: map_id.into(),
                process: process.into(),
                ..LinkMeta::default()
            },
        }
    }

    /// The map this link belongs to.
    pub fn map_id(&self) -> &str {
        &self.meta.map_id
    }

    /// The workflow process that produced this link.
    pub fn process(&self) -> &str {
        &self.meta.process
    }

    /// The predecessor hash, with the empty string normalized to `None`.
    pub fn prev_link_hash(&self) -> Option<&str> {
        self.meta.prev_link_hash.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether this link is the origin of its map.
    pub fn is_root(&self) -> bool {
        self.prev_link_hash().is_none()
    }

    /// Whether the link carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.meta.tags.iter().any(|t| t == tag)
    }

    /// Compute the link's content hash: the domain-tagged BLAKE3 digest of
    /// its canonical JSON serialization.
    pub fn hash(&self) -> Result<LinkHash, ValidationError> {
        let bytes = canonical::to_canonical_vec(self)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(LINK_HASH_DOMAIN);
        hasher.update(&bytes);
        Ok(LinkHash::from_hash(*hasher.finalize().as_bytes()))
    }

    /// Validate required fields and reference shapes.
    ///
    /// Root uniqueness within a map is not checked here: storage accepts
    /// repeat roots, and callers that care run this helper at ingress.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.meta.map_id.is_empty() {
            return Err(ValidationError::MissingMapId);
        }
        if self.meta.process.is_empty() {
            return Err(ValidationError::MissingProcess);
        }
        if let Some(refs) = &self.meta.refs {
            for r in refs {
                r.validate()?;
            }
        }
        Ok(())
    }
}

impl LinkRef {
    /// A `(process, linkHash)` pair reference.
    pub fn pair(process: impl Into<String>, link_hash: impl Into<String>) -> Self {
        Self {
            segment: None,
            process: Some(process.into()),
            link_hash: Some(link_hash.into()),
        }
    }

    /// Accept a full segment, or a complete `(process, linkHash)` pair;
    /// reject every other shape with the interop error message.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(segment) = &self.segment {
            return segment.validate();
        }
        match (self.process.as_deref(), self.link_hash.as_deref()) {
            (Some(process), Some(link_hash)) if !process.is_empty() && !link_hash.is_empty() => {
                Ok(())
            }
            _ => Err(ValidationError::BadReference),
        }
    }
}
