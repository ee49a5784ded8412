//! Diffie-Hellman key agreement over a small prime field.

use rand::Rng;
use std::fmt;

/// Public prime modulus (2^31 - 1).
pub const DH_PRIME: u64 = 2_147_483_647;

/// Public generator (7^5).
pub const DH_GENERATOR: u64 = 16_807;

/// Largest private key ever generated.
pub const PRIVATE_KEY_MAX: u64 = 100_000;

/// Modular exponentiation by square-and-multiply.
///
/// Operands stay below 2^31, so every intermediate product fits in `u64`.
pub fn power_mod(base: u64, exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result = 1;
    let mut base = base % modulus;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % modulus;
        }
        exp >>= 1;
        base = base * base % modulus;
    }
    result
}

/// Draw a private key uniformly from `1..=100000`.
pub fn generate_private_key<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen_range(1..=PRIVATE_KEY_MAX)
}

/// `G^private mod P`.
pub fn calculate_public_key(private_key: u64) -> u64 {
    power_mod(DH_GENERATOR, private_key, DH_PRIME)
}

/// `peer_public^private mod P`.
///
/// The peer's value comes off the wire as a signed integer and is reduced
/// into the field first, so negative or oversized inputs are harmless.
pub fn calculate_shared_secret(peer_public: i64, private_key: u64) -> u64 {
    let reduced = peer_public.rem_euclid(DH_PRIME as i64) as u64;
    power_mod(reduced, private_key, DH_PRIME)
}

/// Symmetric key text shared by both ends of a connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    /// Raw key bytes fed to the cipher.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

// Keep key material out of logs.
impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Map a shared secret to the session key `KEY_<secret>_SECURE`.
pub fn derive_session_key(shared_secret: u64) -> SessionKey {
    SessionKey(format!("KEY_{shared_secret}_SECURE"))
}

/// One side's ephemeral key material.
#[derive(Debug, Clone, Copy)]
pub struct KeyPair {
    private_key: u64,
    /// Value sent to the peer.
    pub public_key: u64,
}

impl KeyPair {
    /// Fresh key pair.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_private(generate_private_key(rng))
    }

    /// Key pair for a known private key.
    pub fn from_private(private_key: u64) -> Self {
        Self {
            private_key,
            public_key: calculate_public_key(private_key),
        }
    }

    /// Complete the exchange with the peer's public key.
    pub fn agree(&self, peer_public: i64) -> SessionKey {
        derive_session_key(calculate_shared_secret(peer_public, self.private_key))
    }
}
