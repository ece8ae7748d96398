//! Bounded retry with jittered backoff
//!
//! Every remote call site goes through [`RetryPolicy::run`]. Errors are not
//! classified: each failure is retried the same way until the attempt budget
//! is spent, and the last error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::Result;

/// Attempt count used when the configured value is missing or unusable
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Upper bound of the first delay in milliseconds
    pub base_ms: u64,
    /// Cap on the delay in milliseconds
    pub max_ms: u64,
}

impl Backoff {
    /// No delay between attempts
    pub const fn none() -> Self {
        Self {
            base_ms: 0,
            max_ms: 0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// The window doubles with each attempt up to `max_ms`; the actual delay
    /// is drawn uniformly from `[0, window]`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let window = self
            .base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_ms.max(self.base_ms));

        Duration::from_millis(rand::rng().random_range(0..=window))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: 3,
            max_ms: 3,
        }
    }
}

/// Retry policy applied uniformly to storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy; zero attempts falls back to the default
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        let max_attempts = if max_attempts == 0 {
            DEFAULT_MAX_ATTEMPTS
        } else {
            max_attempts
        };
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Build a policy from the raw `retry` setting
    ///
    /// Anything that is not a positive integer selects [`DEFAULT_MAX_ATTEMPTS`].
    pub fn from_setting(raw: &str, backoff: Backoff) -> Self {
        let attempts = raw.trim().parse::<u32>().unwrap_or(0);
        Self::new(attempts, backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Retrying {label}"
                    );
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Backoff::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Backoff::none());

        let result: Result<()> = policy
            .run("put a.txt", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(Error::Storage(format!("attempt {n}")))
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().to_string(), "Storage error: attempt 3");
    }

    #[tokio::test]
    async fn test_each_retry_logs_a_warning() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(4, Backoff::none());

        let result: Result<()> = policy
            .run("put a.txt", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Storage("503 slow down".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        let warnings: Vec<String> = logs
            .lines()
            .into_iter()
            .filter(|line| line.contains("WARN") && line.contains("Retrying put a.txt"))
            .collect();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("attempt=1"));
        assert!(warnings[2].contains("attempt=3"));
        assert!(warnings.iter().all(|w| w.contains("503 slow down")));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(5, Backoff::none());

        let result = policy
            .run("list", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(Error::Storage("flaky".into()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(1, Backoff::default());

        let result: Result<()> = policy
            .run("delete", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Storage("denied".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_setting_fallback() {
        let backoff = Backoff::none();
        assert_eq!(RetryPolicy::from_setting("3", backoff).max_attempts(), 3);
        assert_eq!(RetryPolicy::from_setting(" 7 ", backoff).max_attempts(), 7);
        assert_eq!(RetryPolicy::from_setting("0", backoff).max_attempts(), 5);
        assert_eq!(RetryPolicy::from_setting("-2", backoff).max_attempts(), 5);
        assert_eq!(RetryPolicy::from_setting("2.5", backoff).max_attempts(), 5);
        assert_eq!(RetryPolicy::from_setting("many", backoff).max_attempts(), 5);
        assert_eq!(RetryPolicy::from_setting("", backoff).max_attempts(), 5);
    }

    #[test]
    fn test_backoff_delay_is_bounded() {
        let backoff = Backoff {
            base_ms: 100,
            max_ms: 1000,
        };
        for attempt in 1..10 {
            let window = (100u64 << (attempt - 1)).min(1000);
            assert!(backoff.delay(attempt) <= Duration::from_millis(window));
        }
        assert_eq!(Backoff::none().delay(4), Duration::ZERO);
    }

    #[test]
    fn test_simultaneous_delays_are_spread() {
        let backoff = Backoff {
            base_ms: 1000,
            max_ms: 1000,
        };
        let delays: std::collections::BTreeSet<Duration> =
            (0..32).map(|_| backoff.delay(1)).collect();
        assert!(delays.len() > 1, "all delays identical: {delays:?}");
    }
}
