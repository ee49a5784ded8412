//! Per-connection protocol state machine.
//!
//! ```text
//!   ┌────────────┐ Handshake  ┌─────────────┐ RequestRide (sealed) ┌────────┐
//!   │ NoSession  ├───────────►│ Established ├─────────────────────►│ Closed │
//!   └─────┬──────┘◄───────────┴──────┬──────┘  reply, then close   └────────┘
//!         │        re-handshake      │
//!         │ DriverJoin (plaintext)   │ DriverJoin (plaintext or sealed)
//!         └──────────────────────────┴──────────► ack, then close
//! ```
//!
//! Violations (oversized frame, ride request without a session, checksum
//! mismatch, short payload) end the connection without a reply. Frames the
//! server does not understand are skipped.

use crate::admission::unix_now_secs;
use crate::dispatch::{RideOutcome, handle_ride_request};
use crate::error::ConnectionError;
use crate::session::Session;
use dispatch_common::protocol::{
    DriverJoinPayload, Frame, HandshakePayload, Header, MessageType, Opcode, ProtocolError,
    RideRequestPayload, read_frame, write_frame,
};
use dispatch_shared_memory::{Driver, ShmError, SharedStateStore};
use rand::Rng;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// How a connection ended without error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    /// Peer closed before completing a request.
    PeerClosed,
    /// A ride request was answered.
    Ride(RideOutcome),
    /// A driver was registered at `index`.
    DriverJoined { driver_id: u32, index: usize },
    /// Driver table full; the join was acknowledged but not recorded.
    DriverRejected { driver_id: u32 },
}

/// Serves connections against the shared state.
pub struct ConnectionHandler<'a, R: Rng + ?Sized> {
    store: &'a SharedStateStore,
    rng: &'a mut R,
    clock: fn() -> i64,
}

impl<'a, R: Rng + ?Sized> ConnectionHandler<'a, R> {
    pub fn new(store: &'a SharedStateStore, rng: &'a mut R) -> Self {
        Self {
            store,
            rng,
            clock: unix_now_secs,
        }
    }

    /// Replace the wall clock used by rate limiting.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Serve one connection until it completes a request, closes or
    /// violates the protocol. `peer` is only used for logging.
    pub fn serve<S: Read + Write + ?Sized>(
        &mut self,
        stream: &mut S,
        peer: &str,
    ) -> Option<ConnectionOutcome> {
        match self.handle(stream) {
            Ok(outcome) => {
                debug!("Connection from {} finished: {:?}", peer, outcome);
                Some(outcome)
            }
            Err(ConnectionError::Protocol(e)) => {
                warn!(target: "security", peer, error = %e, "Protocol violation, dropping connection");
                None
            }
            Err(ConnectionError::Io(e)) => {
                debug!("Connection from {} failed: {}", peer, e);
                None
            }
            Err(ConnectionError::Shm(e)) => {
                warn!("Shared state unavailable for {}: {}", peer, e);
                None
            }
        }
    }

    /// Run the state machine over `stream`.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Protocol`] for a violation, the other variants for
    /// transport or lock failures. The caller closes the stream either way.
    pub fn handle<S: Read + Write + ?Sized>(
        &mut self,
        stream: &mut S,
    ) -> Result<ConnectionOutcome, ConnectionError> {
        let mut session: Option<Session> = None;

        loop {
            let Some(Frame { header, payload }) = read_frame(stream)? else {
                return Ok(ConnectionOutcome::PeerClosed);
            };

            if header.message_type() == Some(MessageType::Handshake) {
                session = Some(self.answer_handshake(stream, &payload)?);
                continue;
            }

            let sealed = header.message_type() == Some(MessageType::RideRequest);
            let body = if sealed {
                let Some(session) = session.as_ref() else {
                    return Err(ProtocolError::HandshakeRequired.into());
                };
                let body = session.open(&header, &payload)?;

                if header.op() == Some(Opcode::RequestRide) {
                    return self.answer_ride(stream, session, &body);
                }
                body
            } else {
                payload
            };

            if header.op() == Some(Opcode::DriverJoin) {
                return self.answer_driver_join(stream, &body);
            }

            debug!(
                "Ignoring frame type {} opcode {:#06x}",
                header.msg_type, header.opcode
            );
        }
    }

    fn answer_handshake<S: Write + ?Sized>(
        &mut self,
        stream: &mut S,
        payload: &[u8],
    ) -> Result<Session, ConnectionError> {
        let hello = HandshakePayload::decode(payload)?;
        let (session, ack) = Session::respond(hello.public_key, &mut *self.rng);

        let header = Header::new(
            MessageType::HandshakeAck,
            Opcode::Handshake,
            HandshakePayload::SIZE as u32,
        );
        write_frame(stream, &header, &ack.to_bytes())?;
        debug!("Session established");
        Ok(session)
    }

    fn answer_ride<S: Write + ?Sized>(
        &mut self,
        stream: &mut S,
        session: &Session,
        body: &[u8],
    ) -> Result<ConnectionOutcome, ConnectionError> {
        let request = RideRequestPayload::decode(body)?;
        let now = (self.clock)();
        debug!(
            client_id = request.client_id,
            ride_type = request.ride_type,
            "Ride request"
        );

        let outcome = {
            let mut state = self.store.lock()?;
            handle_ride_request(&mut state, &request, now, &mut *self.rng)
        };

        match &outcome {
            RideOutcome::Confirmed { assignment, mode } => info!(
                "Client {} matched with driver {} ({} mode, fare {})",
                request.client_id, assignment.driver_id, mode, assignment.fare
            ),
            RideOutcome::NoDrivers => info!("Client {}: no drivers available", request.client_id),
            RideOutcome::Blocked => {
                warn!(target: "security", client_id = request.client_id, "Rate limit exceeded")
            }
        }

        let (checksum, sealed) = session.seal(outcome.message().as_bytes());
        let header = Header::new(MessageType::RideResponse, Opcode::Response, sealed.len() as u32)
            .with_checksum(checksum);
        write_frame(stream, &header, &sealed)?;
        Ok(ConnectionOutcome::Ride(outcome))
    }

    fn answer_driver_join<S: Write + ?Sized>(
        &mut self,
        stream: &mut S,
        body: &[u8],
    ) -> Result<ConnectionOutcome, ConnectionError> {
        let join = DriverJoinPayload::decode(body)?;

        let added = {
            let mut state = self.store.lock()?;
            state.add_driver(Driver::joined(join.driver_id))
        };

        let outcome = match added {
            Ok(index) => {
                info!("Driver {} joined at slot {}", join.driver_id, index);
                ConnectionOutcome::DriverJoined {
                    driver_id: join.driver_id,
                    index,
                }
            }
            Err(ShmError::CapacityExceeded { capacity, .. }) => {
                warn!(
                    "Driver table full ({} entries), driver {} not registered",
                    capacity, join.driver_id
                );
                ConnectionOutcome::DriverRejected {
                    driver_id: join.driver_id,
                }
            }
            Err(e) => return Err(e.into()),
        };

        let header = Header::new(MessageType::RideResponse, Opcode::Response, 0);
        write_frame(stream, &header, &[])?;
        Ok(outcome)
    }
}
