//! Duplex text transport abstraction for xesremote.
//!
//! A transport carries whole text messages in both directions and reports
//! what happens to the connection as an ordered stream of
//! [`TransportEvent`]s:
//! - WebSocket client over `tokio-tungstenite` (the `ws` feature, on by default)
//! - An in-memory pair for tests and local tooling
//!
//! This is the lowest layer of xesremote. The session layer only ever talks
//! to the [`Transport`] trait defined here.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "ws")]
pub mod ws;

pub use error::{Result, TransportError};
pub use memory::{memory_pair, MemoryTransport, RemoteEnd};
pub use traits::{
    CloseReason, Transport, TransportEvent, UpgradeInfo, CLOSE_ABNORMAL, CLOSE_NORMAL,
    CLOSE_NO_STATUS,
};

#[cfg(feature = "ws")]
pub use ws::WsTransport;
