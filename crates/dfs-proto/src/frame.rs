// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Length-prefixed message framing shared by every TCP link in the system
//! (client<->controller, node<->controller, client<->node).
//!
//! Wire format:
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | JSON payload      |
//! +----------------+-------------------+
//! ```
//!
//! Framing guarantees reliable, ordered, in-process delivery per connection;
//! it carries no opinion about what the payload means. One request per
//! connection is the convention the controller and node protocols follow,
//! but this type itself is connection-agnostic.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default cap on a single frame's JSON payload: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A length-prefixed JSON message channel over a TCP stream.
pub struct MessageChannel {
    stream: TcpStream,
    max_message_size: usize,
    read_buffer: Vec<u8>,
}

impl MessageChannel {
    /// Wrap a connected TCP stream.
    pub fn new(stream: TcpStream, max_message_size: usize) -> Self {
        Self {
            stream,
            max_message_size,
            read_buffer: Vec::with_capacity(4096),
        }
    }

    /// Read and deserialize the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly
    /// between frames.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, FrameError> {
        let mut len_buf = [0u8; 4];
        match self.stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(FrameError::Io(e.to_string())),
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 {
            return Err(FrameError::Protocol("empty message".into()));
        }
        if len > self.max_message_size {
            return Err(FrameError::Protocol(format!(
                "message too large: {len} > {}",
                self.max_message_size
            )));
        }

        self.read_buffer.clear();
        self.read_buffer.resize(len, 0);
        self.stream
            .read_exact(&mut self.read_buffer)
            .await
            .map_err(|e| FrameError::Io(e.to_string()))?;

        let msg = serde_json::from_slice(&self.read_buffer)
            .map_err(|e| FrameError::Protocol(format!("invalid message body: {e}")))?;
        Ok(Some(msg))
    }

    /// Serialize and send a message.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), FrameError> {
        let body = serde_json::to_vec(msg)
            .map_err(|e| FrameError::Protocol(format!("serialize error: {e}")))?;
        if body.len() > self.max_message_size {
            return Err(FrameError::Protocol(format!(
                "response too large: {} > {}",
                body.len(),
                self.max_message_size
            )));
        }

        let len = body.len() as u32;
        self.stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| FrameError::Io(e.to_string()))?;
        self.stream
            .write_all(&body)
            .await
            .map_err(|e| FrameError::Io(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| FrameError::Io(e.to_string()))?;
        Ok(())
    }

    /// Gracefully close the underlying connection.
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| FrameError::Io(e.to_string()))
    }
}

/// Framing error types.
#[derive(Debug)]
pub enum FrameError {
    Io(String),
    Protocol(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {s}"),
            Self::Protocol(s) => write!(f, "protocol error: {s}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    #[tokio::test]
    async fn roundtrip_over_loopback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut chan = MessageChannel::new(stream, DEFAULT_MAX_MESSAGE_SIZE);
            let msg: Ping = chan.recv().await.unwrap().unwrap();
            chan.send(&msg).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut chan = MessageChannel::new(stream, DEFAULT_MAX_MESSAGE_SIZE);
        chan.send(&Ping { n: 42 }).await.unwrap();
        let echoed: Ping = chan.recv().await.unwrap().unwrap();
        assert_eq!(echoed, Ping { n: 42 });

        server.await.unwrap();
    }

    #[tokio::test]
    async fn recv_returns_none_on_clean_close() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut chan = MessageChannel::new(stream, DEFAULT_MAX_MESSAGE_SIZE);
        let msg: Option<Ping> = chan.recv().await.unwrap();
        assert!(msg.is_none());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_oversized_message() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut chan = MessageChannel::new(stream, 8);
            let result: Result<Option<Ping>, FrameError> = chan.recv().await;
            assert!(result.is_err());
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut chan = MessageChannel::new(stream, DEFAULT_MAX_MESSAGE_SIZE);
        chan.send(&Ping { n: 123456 }).await.unwrap();

        server.await.unwrap();
    }
}
