use thiserror::Error;

/// Why an insert left the tree unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InsertError {
    /// Keys must contain at least one byte.
    #[error("key must not be empty")]
    EmptyKey,
    /// The key already names a live entry. Stored values are never overwritten.
    #[error("key is already present")]
    DuplicateKey,
}
