use crate::codec::FrameKind;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame whose tag promises a base64 payload carried something else.
    #[error("invalid base64 payload in frame tagged '{tag}': {source}")]
    InvalidBase64 {
        tag: char,
        #[source]
        source: base64::DecodeError,
    },

    /// The frame kind only ever travels inbound and has no wire encoding.
    #[error("{0:?} frames cannot be encoded")]
    NotEncodable(FrameKind),

    /// Outbound frames are text; the payload was not valid UTF-8.
    #[error("{0:?} payload is not valid UTF-8")]
    NonUtf8Payload(FrameKind),

    /// The language name is not one the backend runs.
    #[error("unknown language '{0}' (expected cpp or python)")]
    UnknownLanguage(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
