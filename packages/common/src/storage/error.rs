use thiserror::Error;

/// Failure of a [`MediaStore`](super::MediaStore) operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Keys are relative paths of `[A-Za-z0-9._-]` segments; anything else is refused.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("object exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl StorageError {
    /// Whether the error means the object is absent rather than unreadable.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
