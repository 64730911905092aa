use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::backoff::Backoff;
use crate::executor::{ExecFuture, Execute, Executor, Interceptor};
use crate::{Error, Request};

/// Callback invoked with the attempt's error and the chosen wait duration
/// on every decision to retry. Observability only; never affects control
/// flow.
pub type Notify = Arc<dyn Fn(&Error, Duration) + Send + Sync>;

/// Wraps an executor to retry failed attempts according to a backoff policy.
///
/// The factory is invoked once per top-level call so every call drives a
/// fresh policy instance.
pub fn with_retry<B, F>(new_backoff: F) -> Interceptor
where
    F: Fn() -> B + Send + Sync + 'static,
    B: Backoff + 'static,
{
    with_retry_notify(new_backoff, None)
}

/// Like [`with_retry`], additionally reporting each retried error to a
/// notify hook.
pub fn with_retry_notify<B, F>(new_backoff: F, notify: Option<Notify>) -> Interceptor
where
    F: Fn() -> B + Send + Sync + 'static,
    B: Backoff + 'static,
{
    let new_backoff: BoxedFactory = Box::new(move || Box::new(new_backoff()));
    Box::new(move |next| {
        Arc::new(RetryExecutor {
            next,
            new_backoff,
            notify,
        })
    })
}

type BoxedFactory = Box<dyn Fn() -> Box<dyn Backoff> + Send + Sync>;

struct RetryExecutor {
    next: Executor,
    new_backoff: BoxedFactory,
    notify: Option<Notify>,
}

impl Execute for RetryExecutor {
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        Box::pin(async move {
            // Make the body replayable before the first attempt. A read
            // failure here is fatal: the transport is never invoked.
            if let Some(body) = req.body.as_mut() {
                if !body.is_replayable() {
                    body.buffer().await.map_err(Error::BodyRead)?;
                }
            }

            let mut policy = (self.new_backoff)();
            loop {
                let err = match self.next.execute(req).await {
                    Ok(res) => return Ok(res),
                    Err(err) => err,
                };

                // Restore the body for the next attempt. A rewind failure
                // aborts the loop out of band, superseding the attempt's
                // error and skipping any remaining scheduled retries.
                if let Some(body) = req.body.as_mut() {
                    if let Err(seek_err) = body.rewind().await {
                        return Err(Error::BodyRewind(seek_err));
                    }
                }

                if let Some(token) = policy.cancel() {
                    if token.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                }

                let wait = match policy.next_backoff() {
                    Some(wait) => wait,
                    None => return Err(err),
                };

                if let Some(notify) = &self.notify {
                    notify(&err, wait);
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "retrying request after backoff wait"
                );

                match policy.cancel() {
                    Some(token) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return Err(Error::Cancelled),
                            _ = sleep(wait) => {}
                        }
                    }
                    None => sleep(wait).await,
                }
            }
        })
    }
}
