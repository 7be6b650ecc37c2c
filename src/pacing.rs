//! Jittered, cancellable delays
//!
//! Every deliberate wait in a job (scroll pauses, stall back-off, batch rests,
//! rate-limit waits) goes through here so that it can be interrupted by the
//! job's [`CancellationToken`].

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A base delay plus a uniformly random extra in `0..=jitter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pacing {
    pub base: Duration,
    pub jitter: Duration,
}

impl Pacing {
    pub const ZERO: Pacing = Pacing {
        base: Duration::ZERO,
        jitter: Duration::ZERO,
    };

    pub fn new(base: impl Into<Duration>, jitter: impl Into<Duration>) -> Self {
        Self {
            base: base.into(),
            jitter: jitter.into(),
        }
    }

    pub fn fixed(base: impl Into<Duration>) -> Self {
        Self::new(base, Duration::ZERO)
    }

    /// Draw one delay
    pub fn sample(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.base + Duration::from_millis(extra)
    }
}

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `false` when the wait was cut short by cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}
