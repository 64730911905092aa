use std::fmt;
use std::io::Cursor;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::{Error, Result};

/// Readable request body source that can also be rewound.
pub trait AsyncReadSeek: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> AsyncReadSeek for T {}

/// Request body.
///
/// A body is readable exactly once unless it is replayable. The retry
/// interceptor buffers one-shot bodies into memory before the first attempt
/// so every attempt sends identical bytes.
pub struct Body(Inner);

enum Inner {
    /// In-memory replay buffer, rewindable without I/O.
    Buffered(Cursor<Vec<u8>>),
    /// Caller-supplied source that supports seeking back to the start.
    Seekable(Box<dyn AsyncReadSeek>),
    /// One-shot source; must be buffered before it can be replayed.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl Body {
    /// Builds a replayable body from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Inner::Buffered(Cursor::new(bytes.into())))
    }

    /// Builds a one-shot body from an async reader.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self(Inner::Stream(Box::new(reader)))
    }

    /// Builds a body from a reader that already supports seeking, e.g. a
    /// file. Such bodies are replayed in place instead of being buffered.
    pub fn from_seekable(reader: impl AsyncRead + AsyncSeek + Send + Unpin + 'static) -> Self {
        Self(Inner::Seekable(Box::new(reader)))
    }

    /// Whether the body can be rewound and re-read from the start.
    pub fn is_replayable(&self) -> bool {
        matches!(self.0, Inner::Buffered(_) | Inner::Seekable(_))
    }

    /// Reads a one-shot body fully into memory, turning it into a replay
    /// buffer positioned at the start. No-op for replayable bodies.
    pub async fn buffer(&mut self) -> std::io::Result<()> {
        if let Inner::Stream(reader) = &mut self.0 {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).await?;
            self.0 = Inner::Buffered(Cursor::new(bytes));
        }
        Ok(())
    }

    /// Seeks back to the start so the body can be read again.
    pub async fn rewind(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Inner::Buffered(cursor) => {
                cursor.set_position(0);
                Ok(())
            }
            Inner::Seekable(reader) => reader
                .seek(std::io::SeekFrom::Start(0))
                .await
                .map(|_| ()),
            Inner::Stream(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "body is not replayable",
            )),
        }
    }

    /// Reads the remaining content to the end. Does not rewind.
    pub async fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match &mut self.0 {
            Inner::Buffered(cursor) => cursor.read_to_end(&mut bytes).await?,
            Inner::Seekable(reader) => reader.read_to_end(&mut bytes).await?,
            Inner::Stream(reader) => reader.read_to_end(&mut bytes).await?,
        };
        Ok(bytes)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Inner::Buffered(cursor) => f
                .debug_struct("Body")
                .field("kind", &"buffered")
                .field("len", &cursor.get_ref().len())
                .finish(),
            Inner::Seekable(_) => f.debug_struct("Body").field("kind", &"seekable").finish(),
            Inner::Stream(_) => f.debug_struct("Body").field("kind", &"stream").finish(),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes.to_vec())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from_bytes(text.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }
}

/// Encodes a value as a JSON request body.
pub fn json_body<T: Serialize>(value: &T) -> Result<Body> {
    let bytes = serde_json::to_vec(value).map_err(Error::Encode)?;
    Ok(Body::from_bytes(bytes))
}
