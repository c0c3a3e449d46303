//! Persistent, reconnecting WebSocket transport.
//!
//! - [`state`]: sans-IO connection state machine
//! - [`backoff`]: capped exponential reconnect delay
//! - [`client`]: tokio driver owning the socket and timers
//! - [`address`]: page URL to socket address

pub mod address;
pub mod backoff;
pub mod client;
pub mod error;
pub mod state;

pub use address::socket_address;
pub use backoff::Backoff;
pub use client::{Transport, TransportHandle, TransportOptions};
pub use error::{TransportError, TransportResult};
pub use state::{CloseOutcome, Connection, ConnectionState, TransportEvent, RETRY_LATER};
