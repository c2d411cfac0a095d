//! Bounded retry of single store calls.

use std::thread;

use tracing::warn;

use taxon_store::{StoreError, StoreResult};

use crate::config::WriterConfig;

/// Why a retried store call finally failed.
#[derive(Debug)]
pub(crate) enum RetryError {
    /// A non-transient error; returned on first sight.
    Permanent(StoreError),
    /// Every attempt hit a transient error.
    Exhausted { attempts: u32, last: StoreError },
}

impl RetryError {
    pub(crate) fn describe(&self) -> String {
        match self {
            RetryError::Permanent(e) => e.to_string(),
            RetryError::Exhausted { attempts, last } => {
                format!("{last} (after {attempts} attempt(s))")
            }
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
pub(crate) fn with_retry<T>(
    config: &WriterConfig,
    label: &'static str,
    mut op: impl FnMut() -> StoreResult<T>,
) -> Result<T, RetryError> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(RetryError::Permanent(err)),
            Err(err) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                })
            }
            Err(err) => {
                warn!(op = label, attempt, error = %err, "transient store failure; retrying");
                let delay = config.backoff_for(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use taxon_types::CategoryId;

    use super::*;

    fn fast(max_attempts: u32) -> WriterConfig {
        WriterConfig {
            max_attempts,
            retry_backoff_ms: 0,
            jitter: false,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let out = with_retry(&fast(3), "test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StoreError::Unavailable("flaky".into()))
            } else {
                Ok(42)
            }
        })
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let calls = Cell::new(0);
        let id = CategoryId::new();
        let err = with_retry(&fast(5), "test", || -> StoreResult<()> {
            calls.set(calls.get() + 1);
            Err(StoreError::DocumentNotFound(id))
        })
        .unwrap_err();
        assert!(matches!(err, RetryError::Permanent(StoreError::DocumentNotFound(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exhaustion_reports_attempts() {
        let calls = Cell::new(0);
        let err = with_retry(&fast(4), "test", || -> StoreResult<()> {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("down".into()))
        })
        .unwrap_err();
        match err {
            RetryError::Exhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        let calls = Cell::new(0);
        let _ = with_retry(&fast(0), "test", || -> StoreResult<()> {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("down".into()))
        });
        assert_eq!(calls.get(), 1);
    }
}
