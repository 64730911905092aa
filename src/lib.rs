//! `intercept-http` is a composable interceptor pipeline for async HTTP
//! requests.
//!
//! A request travels through a chain of interceptors folded around a base
//! transport executor. The crate ships the interceptors that carry real
//! failure-recovery semantics:
//! - [`with_retry_notify`] — retry with a pluggable backoff policy,
//!   replayable request bodies, and cancellable waits
//! - [`with_expect_status`] — turn unexpected status codes into typed errors
//! - [`with_dump_request`] / [`with_dump_response`] — diagnostics
//!
//! [`Client`] holds the static configuration (transport, backoff factory,
//! notify hook) and assembles the chain per call.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use intercept_http::{with_expect_status, Client, Request};
//! use reqwest::Method;
//!
//! # async fn run() -> intercept_http::Result<()> {
//! let client = Client::new()
//!     .with_constant_backoff(Duration::from_millis(250))
//!     .with_max_retries(5);
//!
//! let req = Request::new(Method::GET, "https://example.com/api/orders/1");
//! let res = client.send(req, vec![with_expect_status([200])]).await?;
//! let body = res.text().await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod body;
mod cancel;
mod client;
mod dump;
mod error;
mod executor;
mod request;
mod response;
mod retry;
mod status;
mod transport;

pub use backoff::{
    Backoff, BackoffFactory, ConstantBackoff, ExponentialBackoff, MaxRetries, WithCancel,
};
pub use body::{json_body, AsyncReadSeek, Body};
pub use cancel::CancelToken;
pub use client::Client;
pub use dump::{with_dump_request, with_dump_response};
pub use error::{BoxError, Error, StatusError};
pub use executor::{compose, executor_fn, ExecFuture, Execute, Executor, Interceptor};
pub use request::{
    new_request, with_base_url, with_bearer, with_cancel, with_header, ConfigureRequest, Request,
    RequestFactory,
};
pub use response::{Response, ResponseBody};
pub use retry::{with_retry, with_retry_notify, Notify};
pub use status::with_expect_status;
pub use transport::reqwest_executor;

pub type Result<T> = std::result::Result<T, Error>;
