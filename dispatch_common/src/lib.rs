//! Ride Dispatch Common Library
//!
//! This crate provides the pieces shared by every crate of the dispatch
//! workspace: system-wide constants, TOML configuration loading, the binary
//! wire protocol and the per-connection session crypto.
//!
//! # Module Structure
//!
//! - [`consts`] - Capacities, thresholds and default paths
//! - [`config`] - Configuration loading traits and types
//! - [`protocol`] - Header/payload codec, checksum and framed I/O
//! - [`crypto`] - Diffie-Hellman key agreement and the RC4 stream cipher
//! - [`supervisor`] - Worker pool supervision contract
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dispatch_common::protocol::{Header, MessageType, Opcode, calculate_checksum};
//!
//! let payload = [1u8, 2, 3];
//! let header = Header::new(MessageType::RideRequest, Opcode::RequestRide, payload.len() as u32)
//!     .with_checksum(calculate_checksum(&payload));
//! assert_eq!(header.length, 3);
//! ```

pub mod config;
pub mod consts;
pub mod crypto;
pub mod prelude;
pub mod protocol;
pub mod supervisor;
