//! Byte stream transport carrying framed messages.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream,
};
use tokio::net::TcpStream;

use crate::error::WireError;
use crate::framer;
use crate::message::Message;

/// A duplex connection to a debuggee.
///
/// Any failure while reading or writing marks the transport dead; a dead
/// transport refuses further traffic but still needs [`close`](Self::close)
/// to shut the stream down.
#[derive(Debug)]
pub struct Transport<S> {
    stream: BufStream<S>,
    peer: String,
    alive: bool,
    shut: bool,
    sent: u64,
    received: u64,
}

impl Transport<TcpStream> {
    /// Open a TCP connection to `host:port`.
    ///
    /// No deadline is applied here; callers bound the attempt themselves.
    pub async fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("could not disable Nagle on {host}:{port}: {e}");
        }
        Ok(Self::new(stream, format!("{host}:{port}")))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open stream.
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream: BufStream::new(stream),
            peer: peer.into(),
            alive: true,
            shut: false,
            sent: 0,
            received: 0,
        }
    }

    /// Human-readable name of the remote end.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the connection is still usable.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Number of messages written so far.
    pub fn messages_sent(&self) -> u64 {
        self.sent
    }

    /// Number of messages read so far.
    pub fn messages_received(&self) -> u64 {
        self.received
    }

    /// Read one newline-terminated line of at most `limit` bytes, without
    /// the terminator (a trailing `\r` is also dropped).
    pub async fn read_line(&mut self, limit: usize) -> Result<String, WireError> {
        self.require_alive()?;
        let mut buf = Vec::new();
        let result = (&mut self.stream)
            .take(limit as u64)
            .read_until(b'\n', &mut buf)
            .await;
        if let Err(e) = result {
            return Err(self.fail(e.into()));
        }
        if buf.last() != Some(&b'\n') {
            let err = if buf.len() as u64 >= limit as u64 {
                WireError::violation(format!("line longer than {limit} bytes"))
            } else {
                WireError::TransportLost(std::io::ErrorKind::UnexpectedEof.into())
            };
            return Err(self.fail(err));
        }
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        String::from_utf8(buf).map_err(|_| self.fail(WireError::violation("line is not UTF-8")))
    }

    /// Frame and write one message.
    pub async fn send(&mut self, message: &Message) -> Result<(), WireError> {
        self.require_alive()?;
        tracing::trace!(peer = %self.peer, ?message, "send");
        match framer::send(&mut self.stream, message).await {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Block until one complete message has arrived.
    pub async fn receive(&mut self) -> Result<Message, WireError> {
        self.require_alive()?;
        match framer::receive(&mut self.stream).await {
            Ok(message) => {
                self.received += 1;
                tracing::trace!(peer = %self.peer, ?message, "receive");
                Ok(message)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Shut the connection down, even after a failure. Safe to call more
    /// than once.
    pub async fn close(&mut self) {
        self.alive = false;
        if self.shut {
            return;
        }
        self.shut = true;
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, "shutdown failed: {e}");
        }
    }

    fn require_alive(&self) -> Result<(), WireError> {
        if self.alive {
            Ok(())
        } else {
            Err(WireError::TransportLost(
                std::io::ErrorKind::NotConnected.into(),
            ))
        }
    }

    fn fail(&mut self, err: WireError) -> WireError {
        tracing::debug!(peer = %self.peer, "transport failed: {err}");
        self.alive = false;
        err
    }
}
