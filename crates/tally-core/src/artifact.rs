//! Atomic artifact files: write to `<name>.tmp`, rename into place when complete.
//!
//! Stage skip-checks trust path existence, so a final path must only ever
//! appear once its content is complete.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension used for in-progress artifacts
pub const TMP_EXTENSION: &str = "tmp";

/// Temporary sibling path for `path` (`<path>.tmp`).
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(TMP_EXTENSION);
    PathBuf::from(name)
}

/// Move a finished tmp file over its final path.
pub fn commit_tmp(tmp: &Path, final_path: &Path) -> io::Result<()> {
    fs::rename(tmp, final_path)
}

/// Remove a `<path>.tmp` left behind by an interrupted run.
///
/// Returns whether a stale file was found.
pub fn remove_stale_tmp(path: &Path) -> io::Result<bool> {
    let tmp = tmp_path(path);
    if !tmp.is_file() {
        return Ok(false);
    }
    log::warn!("Removing stale tmp file: {}", tmp.display());
    fs::remove_file(&tmp)?;
    Ok(true)
}
