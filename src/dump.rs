use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::executor::{ExecFuture, Execute, Executor, Interceptor};
use crate::response::ResponseBody;
use crate::{Error, Request};

/// Wraps an executor to write a text dump of each outgoing request.
///
/// With `include_body` set, a replayable body is read, dumped, and rewound;
/// one-shot bodies are skipped so the dump never consumes them. Write
/// failures on the diagnostic writer are ignored.
pub fn with_dump_request<W>(writer: Arc<Mutex<W>>, include_body: bool) -> Interceptor
where
    W: Write + Send + 'static,
{
    Box::new(move |next| {
        Arc::new(DumpRequest {
            next,
            writer,
            include_body,
        })
    })
}

/// Wraps an executor to write a text dump of each incoming response.
///
/// With `include_body` set, the body is drained for the dump and replaced
/// in the response, so downstream consumers still see it.
pub fn with_dump_response<W>(writer: Arc<Mutex<W>>, include_body: bool) -> Interceptor
where
    W: Write + Send + 'static,
{
    Box::new(move |next| {
        Arc::new(DumpResponse {
            next,
            writer,
            include_body,
        })
    })
}

struct DumpRequest<W> {
    next: Executor,
    writer: Arc<Mutex<W>>,
    include_body: bool,
}

impl<W: Write + Send + 'static> Execute for DumpRequest<W> {
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        Box::pin(async move {
            let body = match (self.include_body, req.body.as_mut()) {
                (true, Some(body)) if body.is_replayable() => {
                    let bytes = body.read_all().await.map_err(Error::BodyRead)?;
                    body.rewind().await.map_err(Error::BodyRewind)?;
                    Some(bytes)
                }
                _ => None,
            };

            if let Ok(mut writer) = self.writer.lock() {
                let _ = writeln!(writer, "> {} {}", req.method, req.url);
                for (name, value) in &req.headers {
                    let _ = writeln!(writer, "> {name}: {}", value.to_str().unwrap_or("<bin>"));
                }
                if let Some(bytes) = body {
                    let _ = writeln!(writer, "{}", String::from_utf8_lossy(&bytes));
                }
            }

            self.next.execute(req).await
        })
    }
}

struct DumpResponse<W> {
    next: Executor,
    writer: Arc<Mutex<W>>,
    include_body: bool,
}

impl<W: Write + Send + 'static> Execute for DumpResponse<W> {
    fn execute<'a>(&'a self, req: &'a mut Request) -> ExecFuture<'a> {
        Box::pin(async move {
            let mut res = self.next.execute(req).await?;

            let body = if self.include_body {
                let bytes = res.body.read_all().await.map_err(Error::ResponseRead)?;
                res.body = ResponseBody::from_bytes(bytes.clone());
                Some(bytes)
            } else {
                None
            };

            if let Ok(mut writer) = self.writer.lock() {
                let _ = writeln!(writer, "< {} {}", res.status.as_u16(), res.status_text());
                for (name, value) in &res.headers {
                    let _ = writeln!(writer, "< {name}: {}", value.to_str().unwrap_or("<bin>"));
                }
                if let Some(bytes) = body {
                    let _ = writeln!(writer, "{}", String::from_utf8_lossy(&bytes));
                }
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use reqwest::{Method, StatusCode};

    use super::{with_dump_request, with_dump_response};
    use crate::executor::{executor_fn, ExecFuture, Executor};
    use crate::{Body, Error, Request, Response};

    fn echo_executor() -> Executor {
        executor_fn(|req: &mut Request| -> ExecFuture<'_> {
            Box::pin(async move {
                let body = match req.body.as_mut() {
                    Some(body) => body.read_all().await.map_err(Error::BodyRead)?,
                    None => Vec::new(),
                };
                Ok(Response::from_parts(StatusCode::OK, body))
            })
        })
    }

    #[tokio::test]
    async fn dumps_request_line_and_body_without_consuming_it() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let chain = with_dump_request(sink.clone(), true)(echo_executor());

        let mut req =
            Request::new(Method::POST, "https://example.com/orders").with_body("Buy iPhoneX");
        let res = chain.execute(&mut req).await.expect("must succeed");

        // Downstream executor still saw the full body.
        assert_eq!(res.bytes().await.expect("drain"), b"Buy iPhoneX");

        let dump = String::from_utf8(sink.lock().unwrap().clone()).expect("utf8");
        assert!(dump.contains("> POST https://example.com/orders"));
        assert!(dump.contains("Buy iPhoneX"));
    }

    #[tokio::test]
    async fn dumps_response_and_preserves_body_downstream() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let chain = with_dump_response(sink.clone(), true)(echo_executor());

        let mut req = Request::new(Method::POST, "https://example.com/orders").with_body("test");
        let res = chain.execute(&mut req).await.expect("must succeed");

        assert_eq!(res.bytes().await.expect("drain"), b"test");
        let dump = String::from_utf8(sink.lock().unwrap().clone()).expect("utf8");
        assert!(dump.contains("< 200 OK"));
        assert!(dump.contains("test"));
    }

    #[tokio::test]
    async fn skips_one_shot_request_bodies() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let chain = with_dump_request(sink.clone(), true)(echo_executor());

        let mut req = Request::new(Method::POST, "https://example.com/orders")
            .with_body(Body::from_reader(tokio::io::BufReader::new(&b"stream"[..])));
        let res = chain.execute(&mut req).await.expect("must succeed");

        assert_eq!(res.bytes().await.expect("drain"), b"stream");
        let dump = String::from_utf8(sink.lock().unwrap().clone()).expect("utf8");
        assert!(!dump.contains("stream"));
    }
}
