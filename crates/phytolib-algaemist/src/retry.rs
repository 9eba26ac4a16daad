//! Busy-retry policy for foreground user commands.
//!
//! The channel guard exposes a binary held/free probe rather than a fair
//! wait queue, so a user command that arrives while the poll sampler
//! holds the channel is not queued: the attempt is rescheduled after a
//! fixed delay, a bounded number of times, and then abandoned with a
//! definitive, operator-visible failure. The two contracts this
//! preserves: a user command never interleaves with an in-flight
//! transaction, and a caller is never left hanging indefinitely.
//!
//! The retry is a cooperative loop inside the calling task -- not a
//! self-rescheduling callback chain -- so cancellation and backpressure
//! follow normal async rules.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use phytolib_core::error::{Error, Result};

use crate::guard::ChannelGuard;

/// Delay between busy probes.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Maximum number of attempts before the command is abandoned.
pub const MAX_ATTEMPTS: u32 = 10;

/// Run `op` once the channel is observed free, probing up to
/// [`MAX_ATTEMPTS`] times with [`RETRY_DELAY`] between probes.
///
/// Returns [`Error::Busy`] when the budget is exhausted; the caller is
/// responsible for surfacing that to the operator exactly once.
pub async fn with_busy_retry<T, F, Fut>(guard: &ChannelGuard, what: &str, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = T>,
{
    for attempt in 0..MAX_ATTEMPTS {
        if !guard.is_busy() {
            if attempt > 0 {
                debug!(command = what, attempt, "channel free, running deferred command");
            }
            return Ok(op().await);
        }
        debug!(command = what, attempt, "channel held, rescheduling command");
        tokio::time::sleep(RETRY_DELAY).await;
    }
    debug!(command = what, "retry budget exhausted");
    Err(Error::Busy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ChannelGuard;
    use phytolib_test_harness::MockTransport;

    fn test_guard() -> ChannelGuard {
        ChannelGuard::new(
            Box::new(MockTransport::new()),
            Duration::from_millis(100),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn runs_immediately_when_channel_free() {
        let guard = test_guard();
        let result = with_busy_retry(&guard, "test", || async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_channel_released() {
        let guard = test_guard();
        let hold = guard.try_hold().unwrap();

        let task = {
            let guard = guard.clone();
            tokio::spawn(async move { with_busy_retry(&guard, "test", || async { 7 }).await })
        };

        // Let a few probes fail, then release the channel.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        drop(hold);

        let result = task.await.unwrap();
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_reports_busy_without_running_op() {
        let guard = test_guard();
        let _hold = guard.try_hold().unwrap();

        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran_clone = ran.clone();
        let result = with_busy_retry(&guard, "test", move || {
            let ran = ran_clone.clone();
            async move {
                ran.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Busy)));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
