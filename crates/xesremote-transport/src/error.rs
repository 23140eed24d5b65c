/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint URL could not be turned into a connection request.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Failed to establish the connection.
    #[cfg(feature = "ws")]
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A WebSocket protocol or I/O failure on an established connection.
    #[cfg(feature = "ws")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport is closed (or closing) and cannot carry more messages.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
