use thiserror::Error;

/// Errors produced by model validation and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("meta.mapId should be a non empty string")]
    MissingMapId,

    #[error("meta.process should be a non empty string")]
    MissingProcess,

    #[error("missing segment or (process and linkHash)")]
    BadReference,

    #[error("map {map_id} already has a root link")]
    DuplicateRoot { map_id: String },

    #[error("previous link {link_hash} not found")]
    MissingPrevLink { link_hash: String },

    #[error("link hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },

    #[error("evidence already exists for backend {backend} and provider {provider}")]
    DuplicateEvidence { backend: String, provider: String },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("serialization error: {0}")]
    Serialization(String),
}
