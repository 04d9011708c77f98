//! Source manifest parsing
//!
//! One URL or local path per line. Blank lines and lines starting with `#`
//! are ignored; text after ` #` on a source line is kept as a comment.

use std::path::Path;

use anyhow::{Context, Result};

/// One input file to ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// URL or local path
    pub location: String,
    /// Inline comment following the location, if any
    pub comment: Option<String>,
    /// 1-based line number in the manifest
    pub line: usize,
}

impl SourceDescriptor {
    /// File name the source is stored under in the working directory.
    ///
    /// Last path segment with any query string or fragment removed.
    /// `None` if the location ends in `/` or has no name at all.
    pub fn basename(&self) -> Option<&str> {
        let path = self
            .location
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.location);
        let name = path.rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." {
            None
        } else {
            Some(name)
        }
    }

    /// Whether the source must be fetched over HTTP.
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

/// Parse manifest text into descriptors, in manifest order.
pub fn parse_manifest(text: &str) -> Vec<SourceDescriptor> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (location, comment) = match line.split_once(" #") {
                Some((loc, comment)) => (loc.trim_end(), Some(comment.trim().to_string())),
                None => (line, None),
            };
            Some(SourceDescriptor {
                location: location.to_string(),
                comment,
                line: idx + 1,
            })
        })
        .collect()
}

/// Read and parse a manifest file.
pub fn read_manifest(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    Ok(parse_manifest(&text))
}
