//! Fixed-interval retry for transient upstream conditions

use std::time::Duration;

/// Backoff used by the report export flow when the server answers 400
/// while results are still being generated.
pub const EXPORT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Retry a fallible operation for as long as it fails transiently.
///
/// There is no attempt cap: a transient error is slept off and the exact same
/// operation is attempted again. Non-transient errors return immediately.
pub fn retry_transient<T, E: std::fmt::Display>(
    label: &str,
    backoff: Duration,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
    is_transient: impl Fn(&E) -> bool,
) -> Result<T, E> {
    let mut attempt = 0u64;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if is_transient(&e) => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt} not ready ({e}), retrying in {backoff:?}");
                std::thread::sleep(backoff);
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}
