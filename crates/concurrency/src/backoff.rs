//! Retry budget and backoff delays
//!
//! Transient store faults (timeouts, faulted transactions) are retried a
//! bounded number of times. Between attempts the caller waits a jittered
//! exponential delay drawn uniformly from `[floor, base * 2^attempt)`, with
//! `attempt` starting at 0 for the wait after the first failure.
//!
//! [`RetryPolicy::delay`] is a pure function of the attempt number and a
//! random source, so tests can drive it with a seeded RNG. [`Backoff`]
//! pairs a policy with an owned RNG for production use.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Retry Policy
// ============================================================================

/// Attempt budget and delay bounds for transient faults
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::new()
///     .with_attempts(4)
///     .with_floor_ms(10)
///     .with_base_ms(500);
/// let delay = policy.delay(0, &mut rand::thread_rng());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (never 0)
    pub attempts: u32,
    /// Lower bound of every delay in milliseconds
    pub floor_ms: u64,
    /// Upper bound of the first delay in milliseconds, doubled per attempt
    pub base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            floor_ms: 10,
            base_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Create a RetryPolicy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt with no retries
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            ..Default::default()
        }
    }

    /// Set the total number of attempts (clamped to at least 1)
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Set the minimum delay
    pub fn with_floor_ms(mut self, floor_ms: u64) -> Self {
        self.floor_ms = floor_ms;
        self
    }

    /// Set the upper bound of the first delay
    pub fn with_base_ms(mut self, base_ms: u64) -> Self {
        self.base_ms = base_ms;
        self
    }

    /// True if another attempt is allowed after `made` attempts.
    pub fn allows_retry(&self, made: u32) -> bool {
        made < self.attempts
    }

    /// Exclusive upper bound of the delay after failed attempt `attempt`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        // 1 << 63 is the largest shift that fits
        Duration::from_millis(self.base_ms.saturating_mul(1u64 << attempt.min(63)))
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    ///
    /// Uniform over `[floor, ceiling(attempt))`. If the ceiling does not
    /// exceed the floor the floor is returned.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let floor = self.floor_ms;
        let upper = self.base_ms.saturating_mul(1u64 << attempt.min(63));
        if upper <= floor {
            return Duration::from_millis(floor);
        }
        Duration::from_millis(rng.gen_range(floor..upper))
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// A [`RetryPolicy`] with its own random source
///
/// Shared by concurrent operations; drawing a delay takes a short lock.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl Backoff {
    /// Backoff seeded from OS entropy.
    pub fn new(policy: RetryPolicy) -> Self {
        Backoff {
            policy,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Backoff with a fixed seed, for reproducible delays.
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        Backoff {
            policy,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The policy delays are drawn from.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = self.rng.lock();
        self.policy.delay(attempt, &mut *rng)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

// ============================================================================
// Poll Schedule
// ============================================================================

/// Fixed waits between polls for a collection that is not yet available
///
/// The collection is polled once up front and once after each wait, so a
/// schedule of `n` waits allows `n + 1` polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    waits: Vec<Duration>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule::from_millis(&[1000, 2000, 4000, 8000])
    }
}

impl PollSchedule {
    /// Schedule from explicit waits.
    pub fn new(waits: Vec<Duration>) -> Self {
        PollSchedule { waits }
    }

    /// Schedule from waits in milliseconds.
    pub fn from_millis(waits: &[u64]) -> Self {
        PollSchedule {
            waits: waits.iter().copied().map(Duration::from_millis).collect(),
        }
    }

    /// Poll once, without waiting.
    pub fn immediate() -> Self {
        PollSchedule { waits: Vec::new() }
    }

    /// The waits, in order.
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Maximum number of polls.
    pub fn polls(&self) -> usize {
        self.waits.len() + 1
    }

    /// Sum of all waits.
    pub fn total_wait(&self) -> Duration {
        self.waits.iter().sum()
    }
}
