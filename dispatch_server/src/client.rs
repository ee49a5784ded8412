//! Blocking client for the dispatch protocol.
//!
//! Used by the integration tests and load tools. One client wraps one TCP
//! connection; the server closes the connection after answering a ride
//! request or a driver join, so each request needs a new client.

use crate::error::ClientError;
use crate::session::Session;
use dispatch_common::protocol::{
    DriverJoinPayload, Frame, HandshakePayload, Header, MessageType, Opcode, RideRequestPayload,
    read_frame, write_frame,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Default read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Parsed ride reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideReply {
    Confirmed { driver_id: u32, text: String },
    NoDrivers,
    Blocked,
    Other(String),
}

impl RideReply {
    /// Classify the server's reply text.
    pub fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix("Ride Confirmed! Driver ID: ") {
            let id = rest
                .split_whitespace()
                .next()
                .and_then(|id| id.parse().ok());
            if let Some(driver_id) = id {
                return Self::Confirmed {
                    driver_id,
                    text: text.to_string(),
                };
            }
        }
        match text {
            "Error: No drivers available." => Self::NoDrivers,
            "Error: Blocked." => Self::Blocked,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn driver_id(&self) -> Option<u32> {
        match self {
            Self::Confirmed { driver_id, .. } => Some(*driver_id),
            _ => None,
        }
    }
}

/// One connection to the server.
pub struct DispatchClient {
    stream: TcpStream,
    session: Option<Session>,
    rng: StdRng,
}

impl DispatchClient {
    pub fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        Self::connect_with_timeout(addr, DEFAULT_TIMEOUT)
    }

    pub fn connect_with_timeout(addr: SocketAddr, timeout: Duration) -> Result<Self, ClientError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            session: None,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Run the key agreement.
    pub fn handshake(&mut self) -> Result<(), ClientError> {
        let (pending, hello) = Session::initiate(&mut self.rng);
        let header = Header::new(
            MessageType::Handshake,
            Opcode::Handshake,
            HandshakePayload::SIZE as u32,
        );
        write_frame(&mut self.stream, &header, &hello.to_bytes())?;

        let reply = self.read_reply()?;
        if !reply.header.is(MessageType::HandshakeAck, Opcode::Handshake) {
            return Err(ClientError::UnexpectedReply {
                msg_type: reply.header.msg_type,
                opcode: reply.header.opcode,
            });
        }
        let ack = HandshakePayload::decode(&reply.payload)?;
        self.session = Some(pending.complete(&ack));
        Ok(())
    }

    /// Send a sealed ride request and decrypt the reply.
    pub fn request_ride(&mut self, request: &RideRequestPayload) -> Result<RideReply, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        let (checksum, sealed) = session.seal(&request.to_bytes());
        let header = Header::new(
            MessageType::RideRequest,
            Opcode::RequestRide,
            sealed.len() as u32,
        )
        .with_checksum(checksum);
        write_frame(&mut self.stream, &header, &sealed)?;

        let reply = self.read_reply()?;
        if !reply.header.is(MessageType::RideResponse, Opcode::Response) {
            return Err(ClientError::UnexpectedReply {
                msg_type: reply.header.msg_type,
                opcode: reply.header.opcode,
            });
        }
        let session = self.session.as_ref().ok_or(ClientError::NoSession)?;
        let text = session.open(&reply.header, &reply.payload)?;
        Ok(RideReply::parse(&String::from_utf8_lossy(&text)))
    }

    /// Register a driver with a plaintext join frame.
    pub fn join_driver(&mut self, driver_id: u32) -> Result<(), ClientError> {
        let header = Header {
            length: DriverJoinPayload::SIZE as u32,
            msg_type: 0,
            opcode: Opcode::DriverJoin as u16,
            checksum: 0,
        };
        write_frame(
            &mut self.stream,
            &header,
            &DriverJoinPayload { driver_id }.to_bytes(),
        )?;

        let reply = self.read_reply()?;
        if !reply.header.is(MessageType::RideResponse, Opcode::Response) {
            return Err(ClientError::UnexpectedReply {
                msg_type: reply.header.msg_type,
                opcode: reply.header.opcode,
            });
        }
        Ok(())
    }

    /// Write an arbitrary frame.
    pub fn send_raw(&mut self, header: &Header, payload: &[u8]) -> Result<(), ClientError> {
        write_frame(&mut self.stream, header, payload)?;
        Ok(())
    }

    /// Read one frame, or [`ClientError::Closed`] if the server hung up.
    pub fn read_reply(&mut self) -> Result<Frame, ClientError> {
        read_frame(&mut self.stream)?.ok_or(ClientError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replies() {
        let confirmed =
            RideReply::parse("Ride Confirmed! Driver ID: 1004 (Rating: 4.9, Dist: 0.0031) [Mode: SMART]");
        assert_eq!(confirmed.driver_id(), Some(1004));

        assert_eq!(RideReply::parse("Error: No drivers available."), RideReply::NoDrivers);
        assert_eq!(RideReply::parse("Error: Blocked."), RideReply::Blocked);
        assert_eq!(
            RideReply::parse("something else"),
            RideReply::Other("something else".to_string())
        );
        assert_eq!(RideReply::parse("something else").driver_id(), None);
    }
}
