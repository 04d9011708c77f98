//! Retry with exponential backoff for network fetches

use std::time::Duration;

use indicatif::ProgressBar;

use crate::stream::{StreamError, http_config};

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Retry a fallible fetch with exponential backoff.
///
/// Retryable failures are logged at debug level and retried up to
/// `max_retries` times (from the global [`HttpConfig`](crate::HttpConfig)).
/// Returns the first success, or the last error once retries are exhausted
/// or the error is permanent.
pub fn retry_with_backoff<T>(
    label: &str,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, StreamError>,
) -> Result<T, StreamError> {
    let max_retries = http_config().max_retries;
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                pb.set_message(format!("retry {attempt}/{max_retries}..."));
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => return Err(e),
        }
    }
}
