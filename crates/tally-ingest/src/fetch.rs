//! Fetching a source into the working directory

use std::fs;
use std::path::Path;

use indicatif::ProgressBar;
use tally_core::{StreamError, download_to_file, retry_with_backoff};

use crate::manifest::SourceDescriptor;

/// Brings one source into the working directory at `dest`.
///
/// Implementations must leave `dest` absent on failure: the pipeline treats
/// an existing `dest` as a finished download.
pub trait Fetcher {
    /// Returns the number of bytes written.
    fn fetch(
        &self,
        source: &SourceDescriptor,
        dest: &Path,
        pb: &ProgressBar,
    ) -> Result<u64, StreamError>;
}

/// HTTP(S) download with retry; anything else is copied as a local path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceFetcher;

impl Fetcher for SourceFetcher {
    fn fetch(
        &self,
        source: &SourceDescriptor,
        dest: &Path,
        pb: &ProgressBar,
    ) -> Result<u64, StreamError> {
        if source.is_remote() {
            retry_with_backoff(&source.location, pb, || {
                download_to_file(&source.location, dest, pb)
            })
        } else {
            copy_local(Path::new(&source.location), dest)
        }
    }
}

fn copy_local(src: &Path, dest: &Path) -> Result<u64, StreamError> {
    let tmp = tally_core::tmp_path(dest);
    let copied = fs::copy(src, &tmp).and_then(|n| {
        tally_core::commit_tmp(&tmp, dest)?;
        Ok(n)
    });
    if copied.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(copied?)
}
