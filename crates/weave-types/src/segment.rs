use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::hash::LinkHash;
use crate::link::Link;

/// The read-side projection of a link: the link itself plus derived
/// metadata (its hash and any evidences collected for it).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub link: Link,
    pub meta: SegmentMeta,
}

/// Derived segment metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMeta {
    pub link_hash: LinkHash,
    #[serde(default)]
    pub evidences: Evidences,
}

/// An out-of-band attestation attached to a link.
///
/// Evidences are keyed by the `(backend, provider)` pair; a link holds at
/// most one evidence per pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub backend: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub proof: Value,
}

/// Append-only ordered set of evidences, unique per `(backend, provider)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidences(Vec<Evidence>);

impl Segment {
    /// Build the segment projection of a link, computing its hash.
    pub fn from_link(link: Link) -> Result<Self, ValidationError> {
        let link_hash = link.hash()?;
        Ok(Self {
            link,
            meta: SegmentMeta {
                link_hash,
                evidences: Evidences::default(),
            },
        })
    }

    pub fn link_hash(&self) -> &LinkHash {
        &self.meta.link_hash
    }

    /// Validate the underlying link and check that the recorded hash
    /// matches the link content.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.link.validate()?;
        let computed = self.link.hash()?;
        if computed != self.meta.link_hash {
            return Err(ValidationError::HashMismatch {
                expected: self.meta.link_hash.to_hex(),
                computed: computed.to_hex(),
            });
        }
        Ok(())
    }
}

impl Evidence {
    pub fn new(backend: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            provider: provider.into(),
            proof: Value::Null,
        }
    }

    pub fn with_proof(mut self, proof: Value) -> Self {
        self.proof = proof;
        self
    }
}

impl Evidences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an evidence; fails if one already exists for the same
    /// `(backend, provider)` pair.
    pub fn add(&mut self, evidence: Evidence) -> Result<(), ValidationError> {
        if self.find(&evidence.backend, &evidence.provider).is_some() {
            return Err(ValidationError::DuplicateEvidence {
                backend: evidence.backend,
                provider: evidence.provider,
            });
        }
        self.0.push(evidence);
        Ok(())
    }

    pub fn find(&self, backend: &str, provider: &str) -> Option<&Evidence> {
        self.0
            .iter()
            .find(|e| e.backend == backend && e.provider == provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Evidence> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Evidences {
    type Item = Evidence;
    type IntoIter = std::vec::IntoIter<Evidence>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Evidence> for Evidences {
    fn from_iter<I: IntoIterator<Item = Evidence>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
