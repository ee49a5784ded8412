//! Per-connection key agreement and payload cipher.
//!
//! The key agreement is a Diffie-Hellman exchange over the prime field
//! `2^31 - 1` with private keys drawn from `1..=100000`. That range is far
//! too small for real secrecy and is kept only for interoperability with
//! existing peers. Treat the session as obfuscation plus integrity
//! checking, not confidentiality.

pub mod dh;
pub mod rc4;

pub use dh::{
    DH_GENERATOR, DH_PRIME, KeyPair, SessionKey, calculate_public_key, calculate_shared_secret,
    derive_session_key, generate_private_key, power_mod,
};
pub use rc4::{Rc4, rc4_crypt};
