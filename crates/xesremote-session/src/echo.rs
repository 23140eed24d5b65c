/// Decides whether an output frame is the backend echoing our own input.
///
/// The backend reflects every input frame back inside its output stream.
/// Unless echo was requested, the first output frame after a local send is
/// taken to be that reflection and suppressed.
///
/// This is a single slot: it assumes sends and echoes strictly alternate.
/// Several sends before any output collapse into one expectation, so only
/// the first of their echoes is suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoGate {
    echo: bool,
    awaiting_echo: bool,
}

impl EchoGate {
    /// `echo = true` delivers everything, including echoes of our own input.
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            awaiting_echo: false,
        }
    }

    /// Record that an input frame was just sent.
    pub fn on_local_send(&mut self) {
        self.awaiting_echo = true;
    }

    /// Observe an output frame and decide whether to drop it.
    ///
    /// Always clears the pending expectation.
    pub fn should_suppress(&mut self) -> bool {
        let awaiting = std::mem::take(&mut self.awaiting_echo);
        awaiting && !self.echo
    }

    /// An echo is expected for the most recent send.
    pub fn is_awaiting(&self) -> bool {
        self.awaiting_echo
    }

    pub fn echo_enabled(&self) -> bool {
        self.echo
    }
}
