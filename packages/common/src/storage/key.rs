use std::fmt;

use super::error::StorageError;

/// A validated, relative, ASCII-only object key such as `articles/12/3f2c….jpg`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Maximum accepted key length in bytes.
    pub const MAX_LEN: usize = 512;

    pub fn parse(key: &str) -> Result<Self, StorageError> {
        let invalid = |msg: &str| Err(StorageError::InvalidKey(msg.to_string()));

        if key.is_empty() {
            return invalid("key cannot be empty");
        }
        if key.len() > Self::MAX_LEN {
            return invalid("key exceeds maximum length of 512 characters");
        }
        if key.starts_with('/') || key.ends_with('/') {
            return invalid("key must not start or end with '/'");
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
        {
            return invalid("key contains invalid characters (allowed: a-zA-Z0-9, /, -, _, .)");
        }
        for segment in key.split('/') {
            if segment.is_empty() {
                return invalid("key must not contain empty segments");
            }
            if segment.starts_with('.') {
                return invalid("key segments must not start with '.'");
            }
        }

        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
