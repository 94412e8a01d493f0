use weave_types::ValidationError;

/// Errors produced by store operations.
///
/// Not-found is never an error: readers return `Ok(None)` for absent
/// segments, evidences and values. Backend I/O failures propagate
/// unwrapped in [`StoreError::Backend`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed link, bad reference shape, or a conflicting evidence.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O or database failure from the underlying backend.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated at runtime.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error is a write conflict (duplicate evidence for the
    /// same `(backend, provider)` pair).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Validation(ValidationError::DuplicateEvidence { .. })
        )
    }

    /// Whether this error originates from input validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
