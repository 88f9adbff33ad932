//! Cancellation helpers
//!
//! Every suspension point of the controllers (store calls, backoff and
//! poll waits) races the caller's token. Losing the race drops the pending
//! future and yields `Error::Cancelled`.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use playerdb_core::{Error, Result};

/// Fail with `Cancelled` if `cancel` has fired.
pub(crate) fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Await `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

/// Sleep for `delay` unless `cancel` fires first.
pub(crate) async fn sleep(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    cancellable(cancel, tokio::time::sleep(delay)).await
}
