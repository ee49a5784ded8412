//! Protocol error types.

use thiserror::Error;

/// Errors raised while reading, writing or validating frames.
///
/// Every variant except [`ProtocolError::Io`] is a protocol violation: the
/// server drops the connection without replying.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Declared payload length exceeds the protocol maximum.
    #[error("declared payload length {declared} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Length announced in the header
        declared: u32,
        /// Largest accepted length
        max: u32,
    },

    /// Fewer bytes than the structure requires.
    #[error("truncated {what}: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Structure being decoded
        what: &'static str,
        /// Required byte count
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Business message received before the key agreement completed.
    #[error("ride request received before handshake")]
    HandshakeRequired,

    /// Checksum recomputed after decryption does not match the header.
    #[error("checksum mismatch: header {declared:#06x}, computed {computed:#06x}")]
    ChecksumMismatch {
        /// Checksum carried by the header
        declared: u16,
        /// Checksum of the decrypted payload
        computed: u16,
    },

    /// Peer answered with an unexpected message type.
    #[error("unexpected message type {0}")]
    UnexpectedMessage(u8),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the error is a protocol violation rather than a transport fault.
    pub fn is_violation(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
