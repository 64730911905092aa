use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{Backoff, BackoffFactory, ConstantBackoff, ExponentialBackoff};
use crate::executor::{compose, Executor, Interceptor};
use crate::retry::{with_retry_notify, Notify};
use crate::transport::reqwest_executor;
use crate::{Error, Request, Response, Result};

/// Stateful configuration holder for the request pipeline.
///
/// A client owns a base transport executor, an optional backoff factory,
/// and an optional notify hook. Configuration is read-only after
/// construction, so a client is safe to share across concurrent calls;
/// every call gets its own policy instance and its own body buffer.
#[derive(Clone)]
pub struct Client {
    transport: Executor,
    new_backoff: Option<BackoffFactory>,
    notify: Option<Notify>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("backoff", &self.new_backoff.is_some())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client over a default `reqwest` transport, without retry.
    pub fn new() -> Self {
        Self {
            transport: reqwest_executor(reqwest::Client::new()),
            new_backoff: None,
            notify: None,
        }
    }

    /// Replaces the base transport executor.
    pub fn with_transport(mut self, transport: Executor) -> Self {
        self.transport = transport;
        self
    }

    /// Configures a backoff factory. The factory runs once per call so each
    /// call retries with a fresh policy.
    pub fn with_backoff<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Backoff> + Send + Sync + 'static,
    {
        self.new_backoff = Some(Arc::new(factory));
        self
    }

    /// Configures a constant-interval backoff.
    pub fn with_constant_backoff(self, interval: Duration) -> Self {
        self.with_backoff(move || Box::new(ConstantBackoff::new(interval)))
    }

    /// Configures the default exponential backoff.
    pub fn with_exponential_backoff(self) -> Self {
        self.with_backoff(|| Box::new(ExponentialBackoff::default()))
    }

    /// Bounds the configured backoff to at most `max` retries. Configures
    /// the default exponential backoff first if none is set.
    pub fn with_max_retries(mut self, max: u64) -> Self {
        let factory = self
            .new_backoff
            .take()
            .unwrap_or_else(|| Arc::new(|| Box::new(ExponentialBackoff::default())));
        self.new_backoff = Some(Arc::new(move || Box::new(factory().with_max_retries(max))));
        self
    }

    /// Sets a callback observing every retried error and its wait duration.
    pub fn with_notify<F>(mut self, notify: F) -> Self
    where
        F: Fn(&Error, Duration) + Send + Sync + 'static,
    {
        self.notify = Some(Arc::new(notify));
        self
    }

    /// Sends a request through the composed interceptor chain.
    ///
    /// With a backoff factory configured, the request's cancellation token
    /// is detached and bound to the per-call policy instead, so it
    /// interrupts the waits between attempts; the retry interceptor becomes
    /// the outermost wrapper around the caller-supplied interceptors.
    /// Without one, the token stays on the request and governs the single
    /// attempt directly.
    pub async fn send(&self, mut req: Request, interceptors: Vec<Interceptor>) -> Result<Response> {
        let interceptors = match &self.new_backoff {
            Some(factory) => {
                let token = req.cancel.take();
                let factory = Arc::clone(factory);
                let new_backoff = move || -> Box<dyn Backoff> {
                    let policy = factory();
                    match &token {
                        Some(token) => Box::new(policy.with_cancel(token.clone())),
                        None => policy,
                    }
                };

                let mut chain: Vec<Interceptor> = Vec::with_capacity(interceptors.len() + 1);
                chain.push(with_retry_notify(new_backoff, self.notify.clone()));
                chain.extend(interceptors);
                chain
            }
            None => interceptors,
        };

        let execute = compose(Arc::clone(&self.transport), interceptors);
        execute.execute(&mut req).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use reqwest::{Method, StatusCode};

    use super::Client;
    use crate::executor::{ExecFuture, Execute, Executor};
    use crate::status::with_expect_status;
    use crate::{CancelToken, Error, Request, Response};

    /// Responds with a queue of status codes, repeating the last one.
    struct StatusSequence {
        count: Arc<AtomicUsize>,
        statuses: Vec<StatusCode>,
        saw_request_token: Arc<Mutex<Vec<bool>>>,
    }

    impl Execute for StatusSequence {
        fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
            Box::pin(async move {
                let attempt = self.count.fetch_add(1, Ordering::SeqCst);
                self.saw_request_token
                    .lock()
                    .unwrap()
                    .push(req.cancel.is_some());
                let status = *self
                    .statuses
                    .get(attempt)
                    .or(self.statuses.last())
                    .expect("at least one status");
                Ok(Response::from_parts(status, "test"))
            })
        }
    }

    fn sequence(statuses: Vec<StatusCode>) -> (Executor, Arc<AtomicUsize>, Arc<Mutex<Vec<bool>>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let tokens = Arc::new(Mutex::new(Vec::new()));
        let exec = Arc::new(StatusSequence {
            count: count.clone(),
            statuses,
            saw_request_token: tokens.clone(),
        });
        (exec, count, tokens)
    }

    #[tokio::test]
    async fn single_attempt_without_backoff() {
        let (transport, count, _) = sequence(vec![StatusCode::OK]);
        let client = Client::new().with_transport(transport);

        let req = Request::new(Method::GET, "https://example.com/api/orders/1");
        let res = client
            .send(req, vec![with_expect_status([200])])
            .await
            .expect("must succeed");

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(res.bytes().await.expect("drain"), b"test");
    }

    #[tokio::test]
    async fn retry_wraps_user_interceptors_and_retries_status_errors() {
        // Five rejections, then success on the sixth attempt.
        let mut statuses = vec![StatusCode::FORBIDDEN; 5];
        statuses.push(StatusCode::OK);
        let (transport, count, _) = sequence(statuses);

        let retries = Arc::new(AtomicUsize::new(0));
        let retried = retries.clone();
        let client = Client::new()
            .with_transport(transport)
            .with_constant_backoff(Duration::from_millis(1))
            .with_max_retries(10)
            .with_notify(move |_err, _wait| {
                retried.fetch_add(1, Ordering::SeqCst);
            });

        let req = Request::new(Method::GET, "https://example.com/api/orders/101");
        let res = client
            .send(req, vec![with_expect_status([200])])
            .await
            .expect("sixth attempt must succeed");

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert_eq!(retries.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn exhausted_policy_returns_the_last_status_error() {
        let (transport, count, _) = sequence(vec![StatusCode::FORBIDDEN]);
        let client = Client::new()
            .with_transport(transport)
            .with_constant_backoff(Duration::from_millis(1))
            .with_max_retries(3);

        let req = Request::new(Method::GET, "https://example.com/api/orders/101");
        let err = client
            .send(req, vec![with_expect_status([200])])
            .await
            .expect_err("must exhaust");

        assert_eq!(count.load(Ordering::SeqCst), 4);
        match err {
            Error::Status(status_err) => assert_eq!(status_err.status, StatusCode::FORBIDDEN),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backoff_binding_detaches_the_request_token() {
        let (transport, _, tokens) = sequence(vec![StatusCode::OK]);
        let client = Client::new()
            .with_transport(transport)
            .with_constant_backoff(Duration::from_millis(1));

        let mut req = Request::new(Method::GET, "https://example.com/api/orders/1");
        req.cancel = Some(CancelToken::new());
        client.send(req, Vec::new()).await.expect("must succeed");

        // The transport never sees the token once it is bound to backoff.
        assert_eq!(*tokens.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff_wait() {
        let (transport, count, _) = sequence(vec![StatusCode::INTERNAL_SERVER_ERROR]);
        let client = Client::new()
            .with_transport(transport)
            .with_constant_backoff(Duration::from_millis(50));

        let token = CancelToken::new();
        let mut req = Request::new(Method::GET, "https://example.com/api/orders/1");
        req.cancel = Some(token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client
            .send(req, vec![with_expect_status([200])])
            .await
            .expect_err("must cancel");

        assert!(matches!(err, Error::Cancelled), "got {err:?}");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(40));
    }
}
