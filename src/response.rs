use std::fmt;
use std::io::Cursor;

use reqwest::{header::HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Error, Result};

/// HTTP response produced by an executor.
///
/// Whoever receives a response owns its body; the body is drained at most
/// once and released on drop.
#[derive(Debug)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body stream.
    pub body: ResponseBody,
}

impl Response {
    /// Builds a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Builds a header-less response over in-memory body bytes.
    pub fn from_parts(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, HeaderMap::new(), ResponseBody::from_bytes(body))
    }

    /// Canonical status text, e.g. `"Not Found"` for 404.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Drains the body and returns its bytes.
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        self.body.read_all().await.map_err(Error::ResponseRead)
    }

    /// Drains the body and returns it as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Response body stream.
pub struct ResponseBody(Box<dyn AsyncRead + Send + Unpin>);

impl ResponseBody {
    /// Body over in-memory bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Box::new(Cursor::new(bytes.into())))
    }

    /// Body over an async reader.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self(Box::new(reader))
    }

    /// Empty body.
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Reads the remaining content to the end.
    pub async fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.0.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::Response;

    #[tokio::test]
    async fn status_text_is_canonical_reason() {
        let res = Response::from_parts(StatusCode::NOT_FOUND, b"Order not found".to_vec());
        assert_eq!(res.status_text(), "Not Found");
    }

    #[tokio::test]
    async fn bytes_drains_body() {
        let res = Response::from_parts(StatusCode::OK, "test");
        assert_eq!(res.bytes().await.expect("drain"), b"test");
    }

    #[tokio::test]
    async fn text_replaces_invalid_utf8() {
        let res = Response::from_parts(StatusCode::OK, vec![0x74, 0xff, 0x74]);
        assert_eq!(res.text().await.expect("drain"), "t\u{fffd}t");
    }
}
