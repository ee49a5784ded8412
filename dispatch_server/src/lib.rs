//! # Ride Dispatch Server
//!
//! Multi-worker TCP server that matches ride requests to drivers held in a
//! cross-process shared state store.
//!
//! # Module Structure
//!
//! - [`config`] - `ServerConfig` and its TOML sections
//! - [`coordinator`] - Startup, worker pool supervision, shutdown
//! - [`worker`] - Accept loop and shutdown token
//! - [`handler`] - Per-connection protocol state machine
//! - [`session`] - Key agreement and sealed payloads
//! - [`dispatch`] - Ride request critical section
//! - [`admission`] - Per-client rate limiting
//! - [`matching`] - Driver search strategies
//! - [`ledger`] - Driver lifecycle transitions and revenue
//! - [`pricing`] - Surge quote
//! - [`client`] - Blocking protocol client
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          Coordinator                              │
//! │   SharedStateStore::create ─► initialize_state ─► bind ─► spawn   │
//! └───────┬────────────────────────────┬──────────────────────────────┘
//!         │ fork / thread              │ poll health, restart
//!         ▼                            ▼
//! ┌──────────────┐  accept  ┌─────────────────────┐  lock  ┌─────────────┐
//! │   Worker N   ├─────────►│ ConnectionHandler   ├───────►│ SharedState │
//! │ (run_worker) │          │ handshake → dispatch│        │ (mmap)      │
//! └──────────────┘          └─────────────────────┘        └─────────────┘
//! ```

#![warn(clippy::all)]

pub mod admission;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod ledger;
pub mod matching;
pub mod pricing;
pub mod session;
pub mod worker;

pub use crate::client::{DispatchClient, RideReply};
pub use crate::config::{ServerConfig, WorkerMode};
pub use crate::coordinator::Coordinator;
pub use crate::dispatch::{RideOutcome, handle_ride_request};
pub use crate::error::{ClientError, ConnectionError, ServerError};
pub use crate::handler::{ConnectionHandler, ConnectionOutcome};
pub use crate::worker::ShutdownToken;
