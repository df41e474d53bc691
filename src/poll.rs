//! Cooperative readiness polling.
//!
//! One pattern, two failure policies: startup checks treat a timeout as
//! fatal at the call site, while UI checks use [`assert_eq_eventually`] so
//! a failure reports the last observed value instead of a bare timeout.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{E2eError, E2eResult};

/// Pause between failed predicate attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a UI-state assertion keeps polling before settling.
pub const ASSERT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Repeatedly evaluate `predicate` until it returns true or `timeout`
/// elapses, sleeping `interval` between attempts. `Ok(false)` on timeout;
/// the caller decides whether that is fatal.
pub async fn wait_until<F, Fut>(
    mut predicate: F,
    timeout: Duration,
    interval: Duration,
) -> E2eResult<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(interval).await;
    }
}

/// Poll `fetch` until it produces `expected` or [`ASSERT_TIMEOUT`] passes,
/// then compare one final time. The error carries expected and actual, so
/// a mismatch reads as a value diff rather than a timeout.
pub async fn assert_eq_eventually<T, F, Fut>(mut fetch: F, expected: &T) -> E2eResult<()>
where
    T: PartialEq + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let deadline = Instant::now() + ASSERT_TIMEOUT;
    let mut actual = fetch().await?;
    while actual != *expected && Instant::now() < deadline {
        sleep(POLL_INTERVAL).await;
        actual = fetch().await?;
    }
    if actual == *expected {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn wait_until_stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let ok = wait_until(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(n >= 2)
            },
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_until_returns_false_on_timeout() {
        let ok = wait_until(
            || async { Ok(false) },
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn wait_until_propagates_predicate_errors() {
        let err = wait_until(
            || async { Err(E2eError::Setup("boom".into())) },
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::Setup(_)));
    }

    #[tokio::test]
    async fn assert_eq_eventually_reports_both_values() {
        let err = tokio::time::timeout(
            Duration::from_secs(10),
            assert_eq_eventually(|| async { Ok("actual".to_string()) }, &"wanted".to_string()),
        )
        .await
        .expect("poll must settle")
        .unwrap_err();

        match err {
            E2eError::AssertionFailed { expected, actual } => {
                assert_eq!(expected, "wanted");
                assert_eq!(actual, "actual");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn assert_eq_eventually_accepts_late_convergence() {
        let calls = AtomicU32::new(0);
        assert_eq_eventually(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(if n >= 3 { 42u32 } else { 0 })
            },
            &42u32,
        )
        .await
        .unwrap();
    }
}
