//! Prelude module for common re-exports.
//!
//! ```rust
//! use dispatch_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, DispatchMode, LogLevel, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_CLIENTS, MAX_DRIVERS, MAX_PAYLOAD_LEN, MAX_PENDING_RIDES};

// ─── Wire Protocol ──────────────────────────────────────────────────
pub use crate::protocol::{
    DriverJoinPayload, Frame, HandshakePayload, Header, MessageType, Opcode, ProtocolError,
    ProtocolResult, RideRequestPayload, RideType, calculate_checksum, read_frame, write_frame,
};

// ─── Crypto ─────────────────────────────────────────────────────────
pub use crate::crypto::{KeyPair, SessionKey, rc4_crypt};

// ─── Supervision ────────────────────────────────────────────────────
pub use crate::supervisor::{SupervisorError, WorkerHealth, WorkerId, WorkerSupervisor};
