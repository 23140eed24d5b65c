use std::fmt;
use std::io;

use xesremote_session::SessionError;
use xesremote_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidUrl { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Protocol(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        SessionError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_is_usage_error() {
        let err = session_error(
            "session failed",
            SessionError::Transport(TransportError::InvalidUrl {
                url: "nope".to_string(),
                reason: "relative URL without a base".to_string(),
            }),
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("session failed: invalid endpoint nope"));
    }

    #[test]
    fn io_errors_map_by_kind() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(io_error("read", missing).code, FAILURE);
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            transport_error("connect", TransportError::Io(refused)).code,
            TRANSPORT_ERROR
        );
        let binary = io::Error::new(io::ErrorKind::InvalidData, "not utf-8");
        assert_eq!(io_error("read", binary).code, DATA_INVALID);
    }

    #[test]
    fn closed_session_is_failure() {
        let err = session_error("send failed", SessionError::Closed);
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "send failed: session closed");
    }

    #[test]
    fn transport_closed_is_transport_error() {
        let err = transport_error("send failed", TransportError::Closed);
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
