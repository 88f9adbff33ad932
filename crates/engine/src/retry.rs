//! Bounded retry of transient store faults
//!
//! Both controllers run the same loop: check cancellation, make one
//! attempt in a fresh transaction, and on a transient fault wait a jittered
//! backoff before the next attempt. Anything other than a transient fault
//! ends the loop immediately.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use playerdb_concurrency::Backoff;
use playerdb_core::{Error, Result, StoreFault};

use crate::cancel::{ensure_live, sleep};

/// Outcome of one attempt that did not fail outright
#[derive(Debug)]
pub(crate) enum Attempt<T> {
    /// Finished; return this value
    Done(T),
    /// Hit a transient fault; the attempt's transaction has been released
    Transient(StoreFault),
}

/// Run `attempt` until it finishes, fails, or the attempt budget runs out.
///
/// `attempt` receives the 0-based attempt number. Exhausting the budget
/// yields `Error::Timeout` carrying the last fault.
pub(crate) async fn retry_transient<T, F, Fut>(
    backoff: &Backoff,
    cancel: &CancellationToken,
    operation: &'static str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let policy = backoff.policy();
    let mut made = 0u32;
    loop {
        ensure_live(cancel)?;
        debug!(operation, attempt = made, "store attempt");
        let fault = match attempt(made).await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Transient(fault) => fault,
        };
        made += 1;

        if !policy.allows_retry(made) {
            warn!(operation, attempts = made, error = %fault, "giving up after transient faults");
            return Err(Error::Timeout {
                attempts: made,
                last: fault,
            });
        }

        let delay = backoff.next_delay(made - 1);
        warn!(
            operation,
            attempt = made - 1,
            delay_ms = delay.as_millis() as u64,
            error = %fault,
            "transient store fault, retrying"
        );
        sleep(cancel, delay).await?;
    }
}
