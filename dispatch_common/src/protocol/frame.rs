//! Blocking framed I/O.
//!
//! Reads loop until the exact byte count arrives, retrying on
//! `ErrorKind::Interrupted`, so callers never see a short frame.

use super::error::{ProtocolError, ProtocolResult};
use super::header::Header;
use crate::consts::MAX_PAYLOAD_LEN;
use bytes::BytesMut;
use std::io::{ErrorKind, Read, Write};

/// One header plus its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header as received.
    pub header: Header,
    /// Exactly `header.length` payload bytes.
    pub payload: Vec<u8>,
}

/// Read into `buf` until it is full or the peer closes.
///
/// Returns the number of bytes actually read; anything short of
/// `buf.len()` means EOF.
fn recv_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one frame.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly before
/// sending any header byte.
///
/// # Errors
///
/// - [`ProtocolError::PayloadTooLarge`] if the header declares more than
///   [`MAX_PAYLOAD_LEN`] bytes. No payload byte is consumed.
/// - [`ProtocolError::Truncated`] if the stream ends inside a header or body.
/// - [`ProtocolError::Io`] on transport failure.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> ProtocolResult<Option<Frame>> {
    let mut raw = [0u8; Header::SIZE];
    let got = recv_exact(reader, &mut raw)?;
    if got == 0 {
        return Ok(None);
    }
    let header = Header::decode(&mut &raw[..got])?;

    if header.length > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            declared: header.length,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut payload = vec![0u8; header.length as usize];
    let got = recv_exact(reader, &mut payload)?;
    if got < payload.len() {
        return Err(ProtocolError::Truncated {
            what: "payload",
            expected: payload.len(),
            actual: got,
        });
    }

    Ok(Some(Frame { header, payload }))
}

/// Write header and payload with a single `write_all`.
///
/// The caller is responsible for `header.length` matching `payload.len()`.
pub fn write_frame<W: Write + ?Sized>(
    writer: &mut W,
    header: &Header,
    payload: &[u8],
) -> ProtocolResult<()> {
    let mut buf = BytesMut::with_capacity(Header::SIZE + payload.len());
    header.encode(&mut buf);
    buf.extend_from_slice(payload);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::{MessageType, Opcode};
    use std::io::Cursor;

    /// Reader that yields one byte per call and interrupts every other call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    fn encoded(header: Header, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, &header, payload).unwrap();
        out
    }

    #[test]
    fn test_clean_eof_yields_none() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_frame_survives_partial_and_interrupted_reads() {
        let header = Header::new(MessageType::RideRequest, Opcode::DriverJoin, 4);
        let bytes = encoded(header, &[1, 2, 3, 4]);
        let mut reader = Trickle {
            data: bytes,
            pos: 0,
            interrupt: false,
        };

        let frame = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(frame.header, header);
        assert_eq!(frame.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_oversized_length_rejected_before_body() {
        let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, 1025);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&[0xAB; 16]);
        let mut reader = Cursor::new(bytes);

        let err = read_frame(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadTooLarge { declared: 1025, max: 1024 }
        ));
        assert_eq!(reader.position(), Header::SIZE as u64);
    }

    #[test]
    fn test_maximum_length_accepted() {
        let header = Header::new(MessageType::RideRequest, Opcode::UpdateLocation, 1024);
        let bytes = encoded(header, &[7u8; 1024]);
        let frame = read_frame(&mut Cursor::new(bytes)).unwrap().unwrap();
        assert_eq!(frame.payload.len(), 1024);
    }

    #[test]
    fn test_partial_header_is_truncated() {
        let mut reader = Cursor::new(vec![4u8, 0, 0]);
        assert!(matches!(
            read_frame(&mut reader),
            Err(ProtocolError::Truncated { what: "header", .. })
        ));
    }

    #[test]
    fn test_partial_body_is_truncated() {
        let header = Header::new(MessageType::Handshake, Opcode::Handshake, 8);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);

        let err = read_frame(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated { what: "payload", expected: 8, actual: 3 }
        ));
    }

    #[test]
    fn test_back_to_back_frames() {
        let first = Header::new(MessageType::Handshake, Opcode::Handshake, 2);
        let second = Header::new(MessageType::RideRequest, Opcode::RequestRide, 0);
        let mut bytes = encoded(first, &[9, 9]);
        bytes.extend(encoded(second, &[]));
        let mut reader = Cursor::new(bytes);

        assert_eq!(read_frame(&mut reader).unwrap().unwrap().header, first);
        assert_eq!(read_frame(&mut reader).unwrap().unwrap().header, second);
        assert!(read_frame(&mut reader).unwrap().is_none());
    }
}
