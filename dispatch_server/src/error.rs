//! Server error types.

use dispatch_common::config::ConfigError;
use dispatch_common::protocol::ProtocolError;
use dispatch_common::supervisor::SupervisorError;
use dispatch_shared_memory::ShmError;
use thiserror::Error;

/// Fatal errors that abort startup or shutdown.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("shared state error: {0}")]
    Shm(#[from] ShmError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a single connection. The worker keeps serving.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Protocol violation: dropped without reply.
    #[error("protocol violation: {0}")]
    Protocol(ProtocolError),

    /// Transport failure.
    #[error("transport error: {0}")]
    Io(std::io::Error),

    /// The shared lock could not be taken.
    #[error("shared state error: {0}")]
    Shm(#[from] ShmError),
}

impl From<ProtocolError> for ConnectionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Errors seen by [`crate::client::DispatchClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// Server closed the connection without replying.
    #[error("connection closed by server without reply")]
    Closed,

    /// Request needs a completed handshake.
    #[error("no session established")]
    NoSession,

    /// Reply had an unexpected type or opcode.
    #[error("unexpected reply: type {msg_type}, opcode {opcode:#06x}")]
    UnexpectedReply { msg_type: u8, opcode: u16 },
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl ClientError {
    /// Whether the server dropped the connection, by a clean close or a reset.
    pub fn is_dropped(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
