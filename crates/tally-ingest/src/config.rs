//! Ingestion pipeline configuration

use std::path::PathBuf;

use crate::partition::{CHUNK_SIZE, Compression};

/// Runtime configuration for one ingestion run
#[derive(Debug, Clone)]
pub struct Config {
    /// Manifest listing one source per line
    pub manifest: PathBuf,
    /// Working directory for raw and partitioned artifacts
    pub tmp_dir: PathBuf,
    /// Destination tag
    pub tag: String,
    /// Delete both artifacts once a source is published
    pub delete: bool,
    /// Compression of the source files
    pub compression: Compression,
    /// Partition block size in bytes
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("bz2_url_list.txt"),
            tmp_dir: PathBuf::from("/tmp"),
            tag: "data:big".to_string(),
            delete: false,
            compression: Compression::Bz2,
            chunk_size: CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.tmp_dir, PathBuf::from("/tmp"));
        assert_eq!(config.tag, "data:big");
        assert!(!config.delete);
        assert_eq!(config.compression, Compression::Bz2);
        assert_eq!(config.chunk_size, 100 * 1024);
    }
}
