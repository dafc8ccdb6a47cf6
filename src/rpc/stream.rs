//! Single-shot duplex stream handed to the dispatcher.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// How the dispatcher should treat the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Plain method calls; one request in, one response out.
    MethodInvocation,
    /// Method calls plus subscriptions. Not offered over HTTP.
    Subscriptions,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("stream error: {0}")]
    Io(#[from] io::Error),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("upstream timed out")]
    Timeout,
}

/// Executes admitted JSON-RPC requests.
#[async_trait]
pub trait RpcDispatcher: Send + Sync {
    /// Read exactly one request from `stream` and write exactly one response.
    async fn serve_single_request(
        &self,
        stream: &mut RpcStream,
        mode: InvocationMode,
    ) -> Result<(), DispatchError>;
}

/// Request body on the read side, response body on the write side.
pub struct RpcStream {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    writer: DuplexStream,
}

impl RpcStream {
    pub fn new(reader: Pin<Box<dyn AsyncRead + Send>>, writer: DuplexStream) -> Self {
        Self { reader, writer }
    }
}

impl std::fmt::Debug for RpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcStream").finish_non_exhaustive()
    }
}

impl AsyncRead for RpcStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for RpcStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.writer).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.writer).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_reads_request_and_writes_response() {
        let (writer, mut response) = tokio::io::duplex(64);
        let reader: &'static [u8] = br#"{"id":1}"#;
        let mut stream = RpcStream::new(Box::pin(reader), writer);

        let mut request = String::new();
        stream.read_to_string(&mut request).await.unwrap();
        assert_eq!(request, r#"{"id":1}"#);

        stream.write_all(b"pong").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut out = Vec::new();
        response.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"pong");
    }

    #[tokio::test]
    async fn test_write_fails_once_response_side_is_gone() {
        let (writer, response) = tokio::io::duplex(64);
        let mut stream = RpcStream::new(Box::pin(tokio::io::empty()), writer);
        drop(response);
        assert!(stream.write_all(b"late").await.is_err());
    }
}
