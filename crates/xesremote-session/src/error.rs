use xesremote_frame::FrameError;
use xesremote_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connection-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded. Inbound frames that fail
    /// to decode are dropped; the session keeps running.
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),

    /// The session is closed (or closing) and cannot carry the operation.
    #[error("session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
