use std::fmt;

use async_trait::async_trait;

use crate::error::{Result, TransportError};

/// Close code for a normal, requested shutdown.
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code used when the peer's close frame carried no status.
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Close code used when the connection ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Close status code (1000 = normal, 1005 = no status, 1006 = abnormal).
    pub code: u16,
    /// Human-readable reason supplied by whoever closed the connection.
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// A normal close with an empty reason.
    pub fn normal() -> Self {
        Self::new(CLOSE_NORMAL, "")
    }

    /// The connection ended without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_NORMAL
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

/// Metadata observed when the transport finished opening.
///
/// For WebSocket this is the HTTP upgrade response. Header names are stored
/// lowercased; values are kept as raw bytes since they are not guaranteed to
/// be text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeInfo {
    headers: Vec<(String, Vec<u8>)>,
}

impl UpgradeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    /// First value for `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_slice())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.headers
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_slice()))
    }
}

/// Something that happened on the connection, in the order it happened.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is established and can carry messages.
    Open(UpgradeInfo),
    /// One complete inbound text message.
    Message(String),
    /// A connection-level failure. A [`TransportEvent::Close`] may still follow.
    Error(TransportError),
    /// The connection is closed. No events follow.
    Close(CloseReason),
}

/// A reliable, ordered, message-framed duplex text connection.
///
/// Implementations start unconnected: the first call to
/// [`next_event`](Transport::next_event) drives the connection attempt and
/// yields `Open`, or `Error`/`Close` on failure. Once `Close` has been
/// delivered, `next_event` returns `None`.
///
/// `next_event` must be cancel-safe: dropping the returned future before it
/// completes must not lose an event.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next event on the connection.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Send one text message, completing once it has been handed to the
    /// network (the outbound buffer has drained).
    async fn send(&mut self, text: String) -> Result<()>;

    /// Ask the connection to close. A `Close` event is delivered afterwards.
    async fn close(&mut self) -> Result<()>;

    /// Short transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_info_lookup_is_case_insensitive() {
        let info = UpgradeInfo::new().with_header("X-Host", "node-3");
        assert_eq!(info.header("x-host"), Some(b"node-3".as_ref()));
        assert_eq!(info.header("X-HOST"), Some(b"node-3".as_ref()));
        assert!(info.header("server").is_none());
    }

    #[test]
    fn upgrade_info_returns_first_value() {
        let info = UpgradeInfo::new()
            .with_header("via", "a")
            .with_header("Via", "b");
        assert_eq!(info.header("via"), Some(b"a".as_ref()));
        assert_eq!(info.headers().count(), 2);
    }

    #[test]
    fn close_reason_display() {
        assert_eq!(CloseReason::normal().to_string(), "code 1000");
        assert_eq!(
            CloseReason::abnormal("stream ended").to_string(),
            "code 1006: stream ended"
        );
        assert!(CloseReason::normal().is_normal());
        assert!(!CloseReason::abnormal("x").is_normal());
    }
}
