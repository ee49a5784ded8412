//! Typed message payloads.
//!
//! Each payload has a fixed little-endian encoding. Decoding requires at
//! least the encoded size; trailing bytes are ignored.

use super::error::{ProtocolError, ProtocolResult};
use bytes::{Buf, BufMut};
use static_assertions::const_assert_eq;

fn ensure_len(what: &'static str, expected: usize, actual: usize) -> ProtocolResult<()> {
    if actual < expected {
        return Err(ProtocolError::Truncated {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Key-agreement public key, sent by the client in a handshake and by the
/// server in the acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePayload {
    /// Public key as a signed 64-bit integer.
    pub public_key: i64,
}

impl HandshakePayload {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// Wire encoding.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.public_key.to_le_bytes()
    }

    /// Decode from a payload slice.
    pub fn decode(mut buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len("handshake payload", Self::SIZE, buf.len())?;
        Ok(Self {
            public_key: buf.get_i64_le(),
        })
    }
}

/// Requested ride class. Informational only: VIP status comes from the
/// client id, never from this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum RideType {
    /// Standard ride.
    #[default]
    Normal = 0,
    /// Premium ride.
    Vip = 1,
}

/// Ride request, carried encrypted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RideRequestPayload {
    /// Requesting client.
    pub client_id: u32,
    /// Raw ride class as sent by the client.
    pub ride_type: u32,
    /// Pickup latitude.
    pub lat: f64,
    /// Pickup longitude.
    pub lon: f64,
}

impl RideRequestPayload {
    /// Encoded size in bytes.
    pub const SIZE: usize = 24;

    /// Request at the given pickup position.
    pub fn new(client_id: u32, ride_type: RideType, lat: f64, lon: f64) -> Self {
        Self {
            client_id,
            ride_type: ride_type as u32,
            lat,
            lon,
        }
    }

    /// Wire encoding.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut cursor = &mut out[..];
        cursor.put_u32_le(self.client_id);
        cursor.put_u32_le(self.ride_type);
        cursor.put_f64_le(self.lat);
        cursor.put_f64_le(self.lon);
        out
    }

    /// Decode from a (decrypted) payload slice.
    pub fn decode(mut buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len("ride request payload", Self::SIZE, buf.len())?;
        Ok(Self {
            client_id: buf.get_u32_le(),
            ride_type: buf.get_u32_le(),
            lat: buf.get_f64_le(),
            lon: buf.get_f64_le(),
        })
    }
}

/// Driver registration, carried in plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverJoinPayload {
    /// Id of the joining driver.
    pub driver_id: u32,
}

impl DriverJoinPayload {
    /// Encoded size in bytes.
    pub const SIZE: usize = 4;

    /// Wire encoding.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.driver_id.to_le_bytes()
    }

    /// Decode from a payload slice.
    pub fn decode(mut buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len("driver join payload", Self::SIZE, buf.len())?;
        Ok(Self {
            driver_id: buf.get_u32_le(),
        })
    }
}

const_assert_eq!(HandshakePayload::SIZE, size_of::<i64>());
const_assert_eq!(RideRequestPayload::SIZE, 2 * size_of::<u32>() + 2 * size_of::<f64>());
const_assert_eq!(DriverJoinPayload::SIZE, size_of::<u32>());
