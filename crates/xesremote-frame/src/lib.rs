//! Tag-prefixed text framing for the xesremote protocol.
//!
//! Every message on the wire is a single text frame whose first character
//! is a type tag and whose remainder is the payload:
//! - `1` user input (outbound, raw text) / program output (inbound, base64)
//! - `7` run request (outbound, JSON) / system message (inbound, base64)
//! - `2` liveness ping (outbound) / liveness ack (inbound)
//! - `3` ready signal (inbound)
//!
//! Anything else is passed through undecoded as [`FrameKind::Unknown`].

pub mod codec;
pub mod error;
pub mod request;
pub mod tag;

pub use codec::{
    decode_frame, encode_frame, encode_input, encode_liveness, encode_run_request, Frame,
    FrameKind, HANDSHAKE_PRIMER,
};
pub use error::{FrameError, Result};
pub use request::{Language, RunRequest};
pub use tag::{tag_name, INPUT_OUTPUT, LIVENESS, READY, RUN_SYSTEM};
