//! Per-connection secure session.
//!
//! A session is a derived key plus the seal/open operations over it. Both
//! sides of the connection use the same type: the server builds one with
//! [`Session::respond`], the client with [`Session::initiate`] followed by
//! [`PendingSession::complete`].

use dispatch_common::crypto::{KeyPair, SessionKey, rc4_crypt};
use dispatch_common::protocol::{
    HandshakePayload, Header, ProtocolError, ProtocolResult, calculate_checksum,
};
use rand::Rng;

/// Established session.
#[derive(Debug)]
pub struct Session {
    key: SessionKey,
}

/// Client side half-way through the key agreement.
#[derive(Debug)]
pub struct PendingSession {
    keys: KeyPair,
}

impl Session {
    /// Server side: answer a client's public key. Returns the session and
    /// the payload for the handshake acknowledgement.
    pub fn respond<R: Rng + ?Sized>(
        peer_public: i64,
        rng: &mut R,
    ) -> (Self, HandshakePayload) {
        let keys = KeyPair::generate(rng);
        let session = Self {
            key: keys.agree(peer_public),
        };
        let reply = HandshakePayload {
            public_key: keys.public_key as i64,
        };
        (session, reply)
    }

    /// Client side: start a key agreement. Send the returned payload in a
    /// handshake frame.
    pub fn initiate<R: Rng + ?Sized>(rng: &mut R) -> (PendingSession, HandshakePayload) {
        let keys = KeyPair::generate(rng);
        let hello = HandshakePayload {
            public_key: keys.public_key as i64,
        };
        (PendingSession { keys }, hello)
    }

    /// Session over an already agreed key.
    pub fn from_key(key: SessionKey) -> Self {
        Self { key }
    }

    /// Key used for every message in this session.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Checksum the plaintext, then encrypt it. Returns the header checksum
    /// and the ciphertext.
    pub fn seal(&self, plaintext: &[u8]) -> (u16, Vec<u8>) {
        let checksum = calculate_checksum(plaintext);
        let mut body = plaintext.to_vec();
        rc4_crypt(&mut body, self.key.as_bytes());
        (checksum, body)
    }

    /// Decrypt `ciphertext` and verify it against `header.checksum`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ChecksumMismatch`] when the decrypted bytes do not
    /// match, which is also what a wrong key looks like.
    pub fn open(&self, header: &Header, ciphertext: &[u8]) -> ProtocolResult<Vec<u8>> {
        let mut body = ciphertext.to_vec();
        rc4_crypt(&mut body, self.key.as_bytes());
        let computed = calculate_checksum(&body);
        if computed != header.checksum {
            return Err(ProtocolError::ChecksumMismatch {
                declared: header.checksum,
                computed,
            });
        }
        Ok(body)
    }
}

impl PendingSession {
    /// Finish with the server's acknowledgement.
    pub fn complete(self, ack: &HandshakePayload) -> Session {
        Session {
            key: self.keys.agree(ack.public_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_common::protocol::{MessageType, Opcode};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair() -> (Session, Session) {
        let mut rng = StdRng::seed_from_u64(11);
        let (pending, hello) = Session::initiate(&mut rng);
        let (server, ack) = Session::respond(hello.public_key, &mut rng);
        (pending.complete(&ack), server)
    }

    #[test]
    fn test_both_sides_derive_same_key() {
        let (client, server) = pair();
        assert_eq!(client.key().as_bytes(), server.key().as_bytes());
        assert!(client.key().as_bytes().starts_with(b"KEY_"));
        assert!(client.key().as_bytes().ends_with(b"_SECURE"));
    }

    #[test]
    fn test_seal_then_open() {
        let (client, server) = pair();
        let (checksum, body) = client.seal(b"ride please");
        assert_ne!(&body[..], b"ride please");

        let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, body.len() as u32)
            .with_checksum(checksum);
        assert_eq!(server.open(&header, &body).unwrap(), b"ride please");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let (client, _) = pair();
        let stranger = Session::from_key(dispatch_common::crypto::derive_session_key(42));

        let (checksum, body) = client.seal(&[7u8; 24]);
        let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, 24)
            .with_checksum(checksum);
        assert!(matches!(
            stranger.open(&header, &body),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_checksum_fails() {
        let (client, server) = pair();
        let (checksum, body) = client.seal(b"abc");
        let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, 3)
            .with_checksum(checksum.wrapping_add(1));
        assert!(server.open(&header, &body).is_err());
    }
}
