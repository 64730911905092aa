use std::collections::HashSet;
use std::sync::Arc;

use crate::error::StatusError;
use crate::executor::{ExecFuture, Execute, Executor, Interceptor};
use crate::{Error, Request};

/// Wraps an executor to validate the response status code.
///
/// Transport failures are forwarded untouched. A response whose status is in
/// the acceptable set passes through unchanged; any other response is drained
/// and replaced by [`Error::Status`] carrying the code, status text, and body
/// bytes. If draining fails, the read error is returned instead.
pub fn with_expect_status<I>(acceptable: I) -> Interceptor
where
    I: IntoIterator<Item = u16>,
{
    let acceptable: HashSet<u16> = acceptable.into_iter().collect();
    Box::new(move |next| Arc::new(ExpectStatus { next, acceptable }))
}

struct ExpectStatus {
    next: Executor,
    acceptable: HashSet<u16>,
}

impl Execute for ExpectStatus {
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        Box::pin(async move {
            let mut res = self.next.execute(req).await?;
            if self.acceptable.contains(&res.status.as_u16()) {
                return Ok(res);
            }

            let status = res.status;
            let status_text = res.status_text().to_owned();
            let body = res.body.read_all().await.map_err(Error::ResponseRead)?;
            Err(Error::Status(StatusError {
                status,
                status_text,
                body,
            }))
        })
    }
}
