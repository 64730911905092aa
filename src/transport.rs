use std::sync::Arc;

use crate::executor::{ExecFuture, Execute, Executor};
use crate::response::ResponseBody;
use crate::{Error, Request, Response};

/// Transport executor backed by a `reqwest` client.
///
/// Performs exactly one physical exchange per call: no retry, no status
/// validation. A cancellation token still attached to the request aborts
/// the in-flight exchange with [`Error::Cancelled`].
pub fn reqwest_executor(client: reqwest::Client) -> Executor {
    Arc::new(ReqwestTransport { client })
}

struct ReqwestTransport {
    client: reqwest::Client,
}

impl Execute for ReqwestTransport {
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        Box::pin(async move {
            let url = reqwest::Url::parse(&req.url)
                .map_err(|err| Error::InvalidUrl(format!("{}: {err}", req.url)))?;

            let body = match req.body.as_mut() {
                Some(body) => Some(body.read_all().await.map_err(Error::BodyRead)?),
                None => None,
            };

            let mut builder = self
                .client
                .request(req.method.clone(), url)
                .headers(req.headers.clone());
            if let Some(bytes) = body {
                builder = builder.body(bytes);
            }

            // The exchange covers both the send and the body download so a
            // cancellation fires even while response bytes are still arriving.
            let exchange = async move {
                let response = builder.send().await.map_err(Error::transport)?;
                let status = response.status();
                let headers = response.headers().clone();
                let bytes = response.bytes().await.map_err(Error::transport)?;
                Ok(Response::new(
                    status,
                    headers,
                    ResponseBody::from_bytes(bytes.to_vec()),
                ))
            };

            match req.cancel.clone() {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(Error::Cancelled),
                        result = exchange => result,
                    }
                }
                None => exchange.await,
            }
        })
    }
}
