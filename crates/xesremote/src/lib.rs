//! Client for running programs on a remote compile-and-run backend.
//!
//! A session submits a C++ or Python program over one persistent duplex
//! connection, streams interactive input to it and reports its output,
//! system messages and lifecycle events back to the caller.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex text transport abstraction (WebSocket, in-memory)
//! - [`frame`]: tag-prefixed framing and the run request payload
//! - [`session`]: the session state machine and its public handle

/// Re-export transport types.
pub mod transport {
    pub use xesremote_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xesremote_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use xesremote_session::*;
}
