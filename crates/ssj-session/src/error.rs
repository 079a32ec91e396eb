//! Session error types.

use std::fmt;
use std::time::Duration;

use ssj_wire::{Atom, Message, WireError};
use thiserror::Error;

/// Errors from session operations.
///
/// Only [`SessionError::Remote`], [`SessionError::NotPaused`] and
/// [`SessionError::OutOfRange`] leave the session usable; see
/// [`SessionError::is_fatal`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The greeting line was missing, malformed, or named an unsupported
    /// protocol version, or a setup request was refused.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The connection closed or a read/write failed.
    #[error("lost connection to debuggee: {0}")]
    TransportLost(#[source] std::io::Error),

    /// The debuggee sent something that cannot be decoded.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The debuggee answered a request with an error message.
    #[error("debuggee error: {0}")]
    Remote(RemoteError),

    /// The TCP connection could not be opened.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        /// The address that was dialled.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Connecting or handshaking took longer than the configured deadline.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The operation needs the debuggee to be paused.
    #[error("debuggee is running")]
    NotPaused,

    /// The session has already detached.
    #[error("session is detached")]
    Detached,

    /// An argument does not fit the protocol's 32-bit signed integers.
    /// Nothing was sent.
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: u64 },
}

impl SessionError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SessionError::Remote(_) | SessionError::NotPaused | SessionError::OutOfRange { .. }
        )
    }
}

impl From<WireError> for SessionError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::TransportLost(e) => SessionError::TransportLost(e),
            WireError::ProtocolViolation(detail) => SessionError::ProtocolViolation(detail),
        }
    }
}

/// The payload of an `Error` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Numeric error code, when the debuggee sent one.
    pub code: Option<i32>,
    /// Human-readable description.
    pub message: String,
}

impl RemoteError {
    /// Pull the optional leading code and the first string out of an
    /// `Error` message.
    pub fn from_message(message: &Message) -> Self {
        let code = message.atoms().first().and_then(Atom::as_int);
        let text = message
            .atoms()
            .iter()
            .find_map(Atom::as_str)
            .unwrap_or("unknown error");
        Self {
            code,
            message: text.to_owned(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssj_wire::MessageKind;

    #[test]
    fn error_handshake_failed_display() {
        let err = SessionError::HandshakeFailed("bad greeting".into());
        assert_eq!(err.to_string(), "handshake failed: bad greeting");
    }

    #[test]
    fn error_connect_display() {
        let err = SessionError::Connect {
            addr: "localhost:1208".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "could not connect to localhost:1208: refused");
    }

    #[test]
    fn error_only_refusals_are_recoverable() {
        let remote = SessionError::Remote(RemoteError {
            code: None,
            message: "nope".into(),
        });
        assert!(!remote.is_fatal());
        assert!(!SessionError::NotPaused.is_fatal());
        let range = SessionError::OutOfRange {
            what: "line",
            value: 1 << 31,
        };
        assert!(!range.is_fatal());
        assert_eq!(range.to_string(), "line 2147483648 is out of range");
        assert!(SessionError::Detached.is_fatal());
        assert!(SessionError::ProtocolViolation("x".into()).is_fatal());
        assert!(SessionError::HandshakeFailed("x".into()).is_fatal());
        assert!(SessionError::TimedOut(Duration::from_secs(1)).is_fatal());
    }

    #[test]
    fn error_from_wire_error() {
        let err: SessionError = WireError::violation("bad tag").into();
        assert!(matches!(err, SessionError::ProtocolViolation(ref d) if d == "bad tag"));

        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: SessionError = WireError::TransportLost(io_err).into();
        assert!(matches!(err, SessionError::TransportLost(_)));
    }

    #[test]
    fn remote_error_from_message_with_code() {
        let msg = Message::with_atoms(
            MessageKind::Error,
            vec![Atom::Int(3), Atom::from("file not found")],
        );
        let err = RemoteError::from_message(&msg);
        assert_eq!(err.code, Some(3));
        assert_eq!(err.message, "file not found");
        assert_eq!(err.to_string(), "file not found (code 3)");
    }

    #[test]
    fn remote_error_from_empty_message() {
        let err = RemoteError::from_message(&Message::new(MessageKind::Error));
        assert_eq!(err.code, None);
        assert_eq!(err.to_string(), "unknown error");
    }
}
