//! Fixed-size frame header, message types and opcodes.

use super::error::{ProtocolError, ProtocolResult};
use bytes::{Buf, BufMut};
use static_assertions::const_assert_eq;

/// Message type carried in the header's `type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Business request from a client (ride request, driver join).
    RideRequest = 1,
    /// Server reply to a business request.
    RideResponse = 2,
    /// Client half of the key agreement.
    Handshake = 3,
    /// Server half of the key agreement.
    HandshakeAck = 4,
}

impl MessageType {
    /// Decode a raw type byte.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::RideRequest),
            2 => Some(Self::RideResponse),
            3 => Some(Self::Handshake),
            4 => Some(Self::HandshakeAck),
            _ => None,
        }
    }
}

/// Operation code carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Request a ride (encrypted).
    RequestRide = 0x0001,
    /// Register a new driver (plaintext).
    DriverJoin = 0x0002,
    /// Driver position update. Reserved; the server ignores it.
    UpdateLocation = 0x0003,
    /// Key agreement (both directions).
    Handshake = 0x0004,
    /// Generic server response.
    Response = 0x8000,
}

impl Opcode {
    /// Decode a raw opcode.
    pub const fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0x0001 => Some(Self::RequestRide),
            0x0002 => Some(Self::DriverJoin),
            0x0003 => Some(Self::UpdateLocation),
            0x0004 => Some(Self::Handshake),
            0x8000 => Some(Self::Response),
            _ => None,
        }
    }
}

/// Frame header.
///
/// Raw `msg_type` and `opcode` values are kept as received so that
/// unknown combinations can be ignored instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of payload bytes following the header.
    pub length: u32,
    /// Raw message type.
    pub msg_type: u8,
    /// Raw opcode.
    pub opcode: u16,
    /// Checksum of the plaintext payload, `0` when unused.
    pub checksum: u16,
}

impl Header {
    /// Encoded header size in bytes.
    pub const SIZE: usize = 9;

    /// Header with a zero checksum.
    pub const fn new(msg_type: MessageType, opcode: Opcode, length: u32) -> Self {
        Self {
            length,
            msg_type: msg_type as u8,
            opcode: opcode as u16,
            checksum: 0,
        }
    }

    /// Replace the checksum.
    pub const fn with_checksum(mut self, checksum: u16) -> Self {
        self.checksum = checksum;
        self
    }

    /// Decoded message type, if known.
    pub const fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.msg_type)
    }

    /// Decoded opcode, if known.
    pub const fn op(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode)
    }

    /// Whether the header carries exactly this type and opcode.
    pub fn is(&self, msg_type: MessageType, opcode: Opcode) -> bool {
        self.msg_type == msg_type as u8 && self.opcode == opcode as u16
    }

    /// Append the wire encoding to `buf`.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.length);
        buf.put_u8(self.msg_type);
        buf.put_u16_le(self.opcode);
        buf.put_u16_le(self.checksum);
    }

    /// Encode into a fixed array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut cursor = &mut out[..];
        self.encode(&mut cursor);
        out
    }

    /// Decode a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] when fewer than [`Header::SIZE`] bytes
    /// are available.
    pub fn decode<B: Buf>(buf: &mut B) -> ProtocolResult<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(ProtocolError::Truncated {
                what: "header",
                expected: Self::SIZE,
                actual: buf.remaining(),
            });
        }

        Ok(Self {
            length: buf.get_u32_le(),
            msg_type: buf.get_u8(),
            opcode: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
        })
    }
}

// length + type + opcode + checksum, no padding.
const_assert_eq!(Header::SIZE, 4 + 1 + 2 + 2);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, 24)
            .with_checksum(0xBEEF);
        assert_eq!(
            header.to_bytes(),
            [24, 0, 0, 0, 1, 0x01, 0x00, 0xEF, 0xBE]
        );
    }

    #[test]
    fn test_response_opcode_encoding() {
        let bytes = Header::new(MessageType::RideResponse, Opcode::Response, 0).to_bytes();
        assert_eq!(&bytes[4..7], &[2, 0x00, 0x80]);
    }

    #[test]
    fn test_decode_truncated() {
        let mut short: &[u8] = &[1, 2, 3];
        let err = Header::decode(&mut short).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated { expected: 9, actual: 3, .. }
        ));
    }

    #[test]
    fn test_unknown_codes_survive_decoding() {
        let mut raw: &[u8] = &[0, 0, 0, 0, 9, 0x34, 0x12, 0, 0];
        let header = Header::decode(&mut raw).unwrap();
        assert_eq!(header.msg_type, 9);
        assert_eq!(header.opcode, 0x1234);
        assert_eq!(header.message_type(), None);
        assert_eq!(header.op(), None);
    }

    #[test]
    fn test_type_and_opcode_lookup() {
        assert_eq!(MessageType::from_u8(3), Some(MessageType::Handshake));
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(Opcode::from_u16(0x8000), Some(Opcode::Response));
        assert_eq!(Opcode::from_u16(0x0005), None);

        let header = Header::new(MessageType::Handshake, Opcode::Handshake, 8);
        assert!(header.is(MessageType::Handshake, Opcode::Handshake));
        assert!(!header.is(MessageType::HandshakeAck, Opcode::Handshake));
    }
}
