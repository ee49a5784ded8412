//! Binary wire protocol.
//!
//! Every message is a fixed 9-byte [`Header`] followed by exactly
//! `header.length` payload bytes. All multi-byte integers are little-endian
//! and encoded field by field, so the layout never depends on host padding
//! or byte order.
//!
//! ```text
//! offset  size  field
//! 0       4     length    u32   payload bytes that follow (<= 1024)
//! 4       1     type      u8    MessageType
//! 5       2     opcode    u16   Opcode
//! 7       2     checksum  u16   calculate_checksum(plaintext payload)
//! ```
//!
//! - [`checksum`] - 16-bit folded one's-complement sum
//! - [`header`] - header codec, message types and opcodes
//! - [`payload`] - handshake, ride-request and driver-join payloads
//! - [`frame`] - blocking framed reads and writes over any `Read`/`Write`

pub mod checksum;
pub mod error;
pub mod frame;
pub mod header;
pub mod payload;

pub use checksum::calculate_checksum;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{Frame, read_frame, write_frame};
pub use header::{Header, MessageType, Opcode};
pub use payload::{DriverJoinPayload, HandshakePayload, RideRequestPayload, RideType};
