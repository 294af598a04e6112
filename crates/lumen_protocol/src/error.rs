//! # Protocol Error Types
//!
//! All errors that can occur while encoding, decoding, or streaming events.

use thiserror::Error;

/// Errors produced by the event codec.
///
/// A `ProtocolError` coming off a live connection indicates a codec or
/// version mismatch between root and node and should be treated as fatal
/// for that link - there is no defined partial-message recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The type byte does not name any known event kind.
    #[error("unknown event type byte {0:#04x}")]
    UnknownKind(u8),

    /// The declared payload length exceeds the protocol maximum.
    #[error("declared payload length {0} exceeds DATAMAX")]
    LengthOutOfBounds(usize),

    /// The encoder cursor would run past the end of its bounded buffer.
    #[error("encode overflow: need {needed} bytes, {available} available")]
    Overflow {
        /// Bytes the write required.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// The decoder cursor would run past the end of the input.
    #[error("truncated event: need {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// The payload was longer than the fields of its declared kind.
    #[error("trailing payload bytes after decode: {remaining} remaining")]
    Trailing {
        /// Bytes left unconsumed after all fields were read.
        remaining: usize,
    },
}

/// Errors produced when moving framed events over a byte stream.
#[derive(Error, Debug)]
pub enum WireError {
    /// The underlying stream failed (refused, reset, EOF).
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes on the stream did not form a legal event.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::UnknownKind(0xff);
        assert_eq!(err.to_string(), "unknown event type byte 0xff");

        let err = ProtocolError::Truncated {
            needed: 4,
            available: 1,
        };
        assert!(err.to_string().contains("need 4 bytes"));
    }

    #[test]
    fn test_wire_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed");
        let err = WireError::from(io);
        assert!(matches!(err, WireError::Io(_)));
    }
}
