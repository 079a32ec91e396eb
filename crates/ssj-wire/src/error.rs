//! Wire-level error types.

use thiserror::Error;

/// Errors from encoding, decoding, or moving bytes.
#[derive(Debug, Error)]
pub enum WireError {
    /// The connection closed or a read/write failed, including a stream
    /// that ended in the middle of an atom.
    #[error("transport lost: {0}")]
    TransportLost(#[from] std::io::Error),

    /// The peer sent bytes that do not form a valid atom or message.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl WireError {
    /// Shorthand for a [`WireError::ProtocolViolation`].
    pub fn violation(detail: impl Into<String>) -> Self {
        Self::ProtocolViolation(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_transport_lost_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "early eof");
        let err = WireError::TransportLost(io_err);
        assert_eq!(err.to_string(), "transport lost: early eof");
    }

    #[test]
    fn error_protocol_violation_display() {
        let err = WireError::violation("unknown atom tag 0x1B");
        assert_eq!(err.to_string(), "protocol violation: unknown atom tag 0x1B");
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: WireError = io_err.into();
        assert!(matches!(err, WireError::TransportLost(_)));
    }
}
