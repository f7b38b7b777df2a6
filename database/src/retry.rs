use crate::errors::{StoreError, StoreResult};
use std::thread::sleep;
use std::time::Duration;

/// Retries `f` with exponential back-off while it returns
/// [`StoreError::Backend`], up to `max_retries` attempts. Any other error
/// (including [`StoreError::LockRenewalFailed`]) is returned immediately
/// without retry — only the transient backend classes named in spec §7
/// (`Aborted`, `DeadlineExceeded`, `ServiceUnavailable`) are retried here; the
/// backend is expected to fold those into `StoreError::Backend`.
pub fn with_backoff<T>(max_retries: u32, initial: Duration, mut f: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
    let mut backoff = initial;
    let mut attempt = 0;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(StoreError::Backend(msg)) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(StoreError::Unavailable(msg));
                }
                sleep(backoff);
                backoff *= 2;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(StoreError::Backend("transient".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausts_retries() {
        let result: StoreResult<()> = with_backoff(2, Duration::from_millis(1), || Err(StoreError::Backend("down".into())));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = with_backoff(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::LockRenewalFailed(0))
        });
        assert!(matches!(result, Err(StoreError::LockRenewalFailed(0))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
