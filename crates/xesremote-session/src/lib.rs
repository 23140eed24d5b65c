//! Session state machine for driving a remote program over one connection.
//!
//! A [`Session`] submits a [`RunRequest`](xesremote_frame::RunRequest) during
//! the handshake, streams input to the remote program and hands everything
//! the backend sends back to a [`SessionHandler`], in arrival order. Output
//! that merely echoes our own input is filtered by an [`EchoGate`] unless
//! the request asks for echo.

pub mod config;
pub mod echo;
pub mod error;
pub mod handler;
pub mod liveness;
pub mod session;
pub mod state;

pub use config::{
    SessionConfig, DEFAULT_ENDPOINT, DEFAULT_HOST_HEADER, DEFAULT_LIVENESS_INTERVAL, UNKNOWN_HOST,
};
pub use echo::EchoGate;
pub use error::{Result, SessionError};
pub use handler::{SessionEvent, SessionHandler};
pub use liveness::LivenessTimer;
pub use session::Session;
pub use state::SessionState;
