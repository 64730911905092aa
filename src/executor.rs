use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Boxed future returned by an executor call.
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// One request/response exchange.
///
/// The innermost implementation performs the physical HTTP exchange;
/// interceptors wrap it with pre/post logic. An executor performs no
/// implicit retry and no implicit validation of its own.
pub trait Execute: Send + Sync {
    /// Executes the request once.
    ///
    /// The request is borrowed mutably so outer layers can restore its body
    /// between attempts.
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a>;
}

/// Shared handle to an executor, cheap to clone into composed chains.
pub type Executor = Arc<dyn Execute>;

/// Transformation wrapping an executor with additional behavior.
///
/// Interceptors are consumed by composition; each sees only its immediate
/// `next` executor and may capture configuration at construction time.
pub type Interceptor = Box<dyn FnOnce(Executor) -> Executor + Send>;

/// Composes interceptors around a base executor.
///
/// The list is folded right to left: the first interceptor becomes the
/// outermost wrapper, so for `[a, b]` over base `e` the entry order is
/// `a`, `b`, `e` and results travel back through `b` then `a`.
pub fn compose<I>(base: Executor, interceptors: I) -> Executor
where
    I: IntoIterator<Item = Interceptor>,
    I::IntoIter: DoubleEndedIterator,
{
    interceptors
        .into_iter()
        .rev()
        .fold(base, |next, intercept| intercept(next))
}

struct FnExecutor<F>(F);

impl<F> Execute for FnExecutor<F>
where
    F: for<'a> Fn(&'a mut Request) -> ExecFuture<'a> + Send + Sync,
{
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        (self.0)(req)
    }
}

/// Adapts a closure returning a boxed future into an [`Executor`].
pub fn executor_fn<F>(f: F) -> Executor
where
    F: for<'a> Fn(&'a mut Request) -> ExecFuture<'a> + Send + Sync + 'static,
{
    Arc::new(FnExecutor(f))
}
