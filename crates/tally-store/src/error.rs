//! Errors from the chunk store

use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    /// Tag name is empty or contains characters the store can't address
    InvalidTag(String),
    /// A record in a published file exceeds the store's record size limit.
    ///
    /// This is the value/format rejection callers may recover from; nothing
    /// from `path` was attached.
    RecordTooLarge {
        path: PathBuf,
        record_len: usize,
        limit: usize,
    },
    /// Tag has no data
    NotFound(String),
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(tag) => write!(f, "invalid tag name: {tag:?}"),
            Self::RecordTooLarge {
                path,
                record_len,
                limit,
            } => write!(
                f,
                "record of {record_len} bytes exceeds limit of {limit} bytes in {}",
                path.display()
            ),
            Self::NotFound(tag) => write!(f, "tag not found: {tag}"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl StoreError {
    /// Whether the store rejected the content itself (as opposed to failing).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::RecordTooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_too_large_is_rejection() {
        let err = StoreError::RecordTooLarge {
            path: PathBuf::from("/tmp/x"),
            record_len: 10,
            limit: 5,
        };
        assert!(err.is_rejection());
        assert!(format!("{err}").contains("/tmp/x"));
    }

    #[test]
    fn io_is_not_rejection() {
        let err = StoreError::Io(std::io::Error::other("boom"));
        assert!(!err.is_rejection());
    }
}
