use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::CancelToken;

/// Stateful schedule of retry wait durations.
///
/// A policy instance drives one call's retry loop. Policies are created
/// fresh per call through a [`BackoffFactory`], never shared across calls.
pub trait Backoff: Send {
    /// Next wait duration, or `None` when the policy is exhausted.
    fn next_backoff(&mut self) -> Option<Duration>;

    /// Cancellation signal bound to this policy, if any. The retry loop
    /// selects on it while waiting between attempts.
    fn cancel(&self) -> Option<CancelToken> {
        None
    }

    /// Bounds the policy to at most `max` retries.
    fn with_max_retries(self, max: u64) -> MaxRetries<Self>
    where
        Self: Sized,
    {
        MaxRetries {
            inner: self,
            remaining: max,
        }
    }

    /// Binds a cancellation token to the policy so waits are interruptible.
    fn with_cancel(self, token: CancelToken) -> WithCancel<Self>
    where
        Self: Sized,
    {
        WithCancel { inner: self, token }
    }
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        (**self).next_backoff()
    }

    fn cancel(&self) -> Option<CancelToken> {
        (**self).cancel()
    }
}

/// Creates a fresh policy for each top-level call.
pub type BackoffFactory = Arc<dyn Fn() -> Box<dyn Backoff> + Send + Sync>;

/// Fixed interval between attempts, never exhausted on its own.
#[derive(Clone, Debug)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    /// Creates a constant policy with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Backoff for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.interval)
    }
}

/// Doubling interval capped at a maximum, exhausted after a total elapsed
/// time budget.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    current: Duration,
    max_interval: Duration,
    max_elapsed: Option<Duration>,
    started: Option<Instant>,
}

impl ExponentialBackoff {
    /// Creates an exponential policy starting at `initial`.
    pub fn new(initial: Duration) -> Self {
        Self {
            current: initial,
            ..Self::default()
        }
    }

    /// Caps the interval growth.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max_interval = max;
        self
    }

    /// Sets the total elapsed time after which the policy is exhausted.
    /// `None` retries indefinitely.
    pub fn max_elapsed(mut self, max: Option<Duration>) -> Self {
        self.max_elapsed = max;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            current: Duration::from_millis(250),
            max_interval: Duration::from_secs(60),
            max_elapsed: Some(Duration::from_secs(15 * 60)),
            started: None,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let started = *self.started.get_or_insert(now);
        if let Some(max_elapsed) = self.max_elapsed {
            if now.duration_since(started) >= max_elapsed {
                return None;
            }
        }
        let interval = self.current;
        self.current = self.current.saturating_mul(2).min(self.max_interval);
        Some(interval)
    }
}

/// Bounds an inner policy to a maximum retry count.
#[derive(Clone, Debug)]
pub struct MaxRetries<B> {
    inner: B,
    remaining: u64,
}

impl<B: Backoff> Backoff for MaxRetries<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.inner.next_backoff()
    }

    fn cancel(&self) -> Option<CancelToken> {
        self.inner.cancel()
    }
}

/// Binds a cancellation token to an inner policy.
#[derive(Clone, Debug)]
pub struct WithCancel<B> {
    inner: B,
    token: CancelToken,
}

impl<B: Backoff> Backoff for WithCancel<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.token.is_cancelled() {
            return None;
        }
        self.inner.next_backoff()
    }

    fn cancel(&self) -> Option<CancelToken> {
        Some(self.token.clone())
    }
}
