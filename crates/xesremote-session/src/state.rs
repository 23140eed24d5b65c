use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Connecting ──open──▶ AwaitingReady ──ready──▶ Open
///      │                    │                    │
///      └──────────── close event ────────────────┴──▶ Closing ──▶ Closed
///      any state ── error event ──▶ Failed ── close event ──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the transport to open.
    Connecting,
    /// Handshake sent; waiting for the backend's ready signal.
    AwaitingReady,
    /// Backend ready; input and output flow.
    Open,
    /// Close requested or observed; waiting for the transport to finish.
    Closing,
    /// Finished. No further events.
    Closed,
    /// The transport reported an error. A close event still follows.
    Failed,
}

impl SessionState {
    /// The transport is open and can carry input frames.
    pub fn is_transport_open(self) -> bool {
        matches!(self, SessionState::AwaitingReady | SessionState::Open)
    }

    /// The session is on its way out; new operations are rejected.
    pub fn is_shutting_down(self) -> bool {
        matches!(
            self,
            SessionState::Closing | SessionState::Closed | SessionState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::AwaitingReady => "awaiting-ready",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_open_states() {
        assert!(!SessionState::Connecting.is_transport_open());
        assert!(SessionState::AwaitingReady.is_transport_open());
        assert!(SessionState::Open.is_transport_open());
        assert!(!SessionState::Closing.is_transport_open());
        assert!(!SessionState::Failed.is_transport_open());
    }

    #[test]
    fn shutting_down_states() {
        assert!(!SessionState::Open.is_shutting_down());
        assert!(SessionState::Closing.is_shutting_down());
        assert!(SessionState::Closed.is_shutting_down());
        assert!(SessionState::Failed.is_shutting_down());
    }
}
