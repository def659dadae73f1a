//! Reconnect scheduling with capped exponential backoff.
//!
//! The delay for a given attempt is `min(base * 2^attempt, max)`. No jitter
//! is applied: this is a single client talking to a single server, so there
//! is no herd to spread out.

use std::future::Future;
use std::time::Duration;

use notice_core::config::ChannelConfig;
use notice_core::constants::backoff;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::RetryState;

/// Immutable reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first reconnect.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Reconnects allowed after consecutive failures.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(backoff::BASE_DELAY_MS),
            max_delay: Duration::from_millis(backoff::MAX_DELAY_MS),
            max_retries: backoff::MAX_RETRIES,
        }
    }
}

impl From<&ChannelConfig> for RetryPolicy {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            max_retries: config.max_retries,
        }
    }
}

impl RetryPolicy {
    /// Delay before reconnect number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(factor);
        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }
}

/// Outcome of consulting the scheduler after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Reconnect number `attempt` (one-based) should run after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// The budget is spent after `attempts` reconnects.
    Exhausted { attempts: u32 },
}

/// Decides whether and when to reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectScheduler {
    policy: RetryPolicy,
}

impl ReconnectScheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Consume one unit of retry budget, or report exhaustion.
    ///
    /// `retry.attempt` only ever grows here; resetting it is the manager's
    /// job once a socket opens.
    pub fn next(&self, retry: &mut RetryState) -> Schedule {
        if retry.attempt >= self.policy.max_retries {
            return Schedule::Exhausted {
                attempts: retry.attempt,
            };
        }
        let delay = self.policy.delay(retry.attempt);
        retry.attempt += 1;
        retry.next_delay = delay;
        Schedule::Retry {
            attempt: retry.attempt,
            delay,
        }
    }
}

/// Holds at most one pending reconnect.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    handle: Option<JoinHandle<()>>,
}

impl ReconnectTimer {
    /// Run `on_fire` after `delay`, cancelling any previously armed timer.
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire.await;
        }));
    }

    /// Abort the pending timer, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("reconnect timer cancelled");
            handle.abort();
        }
    }

    /// Forget the timer without aborting it; used by the timer's own callback.
    pub fn disarm(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
