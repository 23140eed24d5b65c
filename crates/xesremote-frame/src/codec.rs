use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use bytes::Bytes;

use crate::error::{FrameError, Result};
use crate::request::RunRequest;
use crate::tag::{INPUT_OUTPUT, LIVENESS, READY, RUN_SYSTEM};

/// First message sent after the transport opens, before the run request.
pub const HANDSHAKE_PRIMER: &str = "{}";

/// Standard alphabet, padding optional. Whitespace and URL-safe characters
/// are normalized before this engine sees the input.
const PERMISSIVE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// What a frame means. Tags are shared between directions, so the kind
/// records which side of the pair this frame is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Outbound user input (`1`).
    Input,
    /// Outbound run request (`7`).
    RunRequest,
    /// Liveness ping (outbound) or ack (inbound) (`2`).
    Liveness,
    /// Inbound program output (`1`).
    Output,
    /// Inbound system/status message (`7`).
    SystemMessage,
    /// Inbound ready signal (`3`).
    ReadySignal,
    /// Any other inbound message.
    Unknown,
}

/// A decoded inbound frame, or the parts of an outbound one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What the frame means.
    pub kind: FrameKind,
    /// Decoded payload. For [`FrameKind::Unknown`] this is the complete raw message.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Encode an outbound frame into its wire text.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────────────────┐
/// │ Tag (1B) │ Payload                      │
/// │ '1'      │ input text, verbatim         │
/// │ '7'      │ run request JSON             │
/// │ '2'      │ (none)                       │
/// └──────────┴──────────────────────────────┘
/// ```
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> Result<String> {
    let tag = match kind {
        FrameKind::Input => INPUT_OUTPUT,
        FrameKind::RunRequest => RUN_SYSTEM,
        FrameKind::Liveness => return Ok(encode_liveness()),
        other => return Err(FrameError::NotEncodable(other)),
    };
    let text = std::str::from_utf8(payload).map_err(|_| FrameError::NonUtf8Payload(kind))?;

    let mut out = String::with_capacity(1 + text.len());
    out.push(char::from(tag));
    out.push_str(text);
    Ok(out)
}

/// Encode user input. The text goes on the wire as-is, not base64.
pub fn encode_input(text: &str) -> String {
    let mut out = String::with_capacity(1 + text.len());
    out.push(char::from(INPUT_OUTPUT));
    out.push_str(text);
    out
}

/// Encode the run request frame.
pub fn encode_run_request(request: &RunRequest) -> Result<String> {
    let json = request.to_json()?;
    encode_frame(FrameKind::RunRequest, json.as_bytes())
}

/// Encode a liveness ping.
pub fn encode_liveness() -> String {
    char::from(LIVENESS).to_string()
}

/// Decode one inbound wire message.
///
/// Output and system frames have their base64 payload decoded; a malformed
/// payload is an error. Unrecognized messages (including the empty string)
/// decode to [`FrameKind::Unknown`] with the whole message as payload and
/// never fail.
pub fn decode_frame(text: &str) -> Result<Frame> {
    let bytes = text.as_bytes();
    let Some(&tag) = bytes.first() else {
        return Ok(Frame::new(FrameKind::Unknown, Bytes::new()));
    };
    // Every known tag is ASCII, so slicing past it stays on a char boundary.
    let rest = &bytes[1..];

    let frame = match tag {
        INPUT_OUTPUT => Frame::new(FrameKind::Output, decode_base64(tag, rest)?),
        RUN_SYSTEM => Frame::new(FrameKind::SystemMessage, decode_base64(tag, rest)?),
        READY => Frame::new(FrameKind::ReadySignal, Bytes::copy_from_slice(rest)),
        LIVENESS => Frame::new(FrameKind::Liveness, Bytes::copy_from_slice(rest)),
        _ => Frame::new(FrameKind::Unknown, Bytes::copy_from_slice(bytes)),
    };
    Ok(frame)
}

fn decode_base64(tag: u8, payload: &[u8]) -> Result<Bytes> {
    let normalized: Vec<u8> = payload
        .iter()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|&b| match b {
            b'-' => b'+',
            b'_' => b'/',
            other => other,
        })
        .collect();

    PERMISSIVE_BASE64
        .decode(normalized)
        .map(Bytes::from)
        .map_err(|source| FrameError::InvalidBase64 {
            tag: char::from(tag),
            source,
        })
}
