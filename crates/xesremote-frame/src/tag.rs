//! Frame type tags.
//!
//! The same tag means different things depending on direction; the names
//! below are the outbound/inbound pairs.

/// User input (outbound) / program output (inbound).
pub const INPUT_OUTPUT: u8 = b'1';

/// Liveness ping (outbound) / liveness ack (inbound).
pub const LIVENESS: u8 = b'2';

/// Backend ready signal (inbound only).
pub const READY: u8 = b'3';

/// Run request (outbound) / system message (inbound).
pub const RUN_SYSTEM: u8 = b'7';

/// Returns a human-readable name for an inbound tag byte.
pub fn tag_name(tag: Option<u8>) -> &'static str {
    match tag {
        Some(INPUT_OUTPUT) => "OUTPUT",
        Some(LIVENESS) => "LIVENESS",
        Some(READY) => "READY",
        Some(RUN_SYSTEM) => "SYSTEM",
        Some(_) => "UNKNOWN",
        None => "EMPTY",
    }
}
