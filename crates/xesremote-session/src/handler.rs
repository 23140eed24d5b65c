use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::trace;
use xesremote_transport::CloseReason;

use crate::error::SessionError;

/// Receives everything a session reports, in the order it happened.
///
/// Every method has a no-op default, so implementors only override what
/// they care about. The handler is handed to the session at construction,
/// which guarantees it is in place before the transport opens.
///
/// Calls are awaited one at a time on the session's driver task before the
/// next inbound frame is looked at, so a slow handler slows the session
/// down rather than queueing frames. For the same reason a handler must not
/// await [`Session::send`](crate::Session::send) or
/// [`Session::close`](crate::Session::close) itself; hand the work to
/// another task instead.
#[async_trait]
pub trait SessionHandler: Send + 'static {
    /// The backend signalled ready. Fires at most once.
    async fn on_open(&mut self) {}

    /// Program output, already base64-decoded. Echoes of our own input are
    /// not delivered unless the request enabled echo.
    async fn on_output(&mut self, data: Bytes) {
        let _ = data;
    }

    /// System/status message from the backend, already base64-decoded.
    async fn on_system_message(&mut self, data: Bytes) {
        let _ = data;
    }

    /// A message with an unrecognized tag, exactly as received.
    async fn on_unknown(&mut self, raw: Bytes) {
        let _ = raw;
    }

    /// The connection closed. Fires exactly once, last.
    async fn on_close(&mut self, reason: CloseReason) {
        let _ = reason;
    }

    /// A transport failure or a frame that could not be decoded.
    async fn on_error(&mut self, error: SessionError) {
        let _ = error;
    }
}

/// Ignores everything.
#[async_trait]
impl SessionHandler for () {}

/// One session notification, for consumers that prefer a channel.
#[derive(Debug)]
pub enum SessionEvent {
    Open,
    Output(Bytes),
    SystemMessage(Bytes),
    Unknown(Bytes),
    Error(SessionError),
    Close(CloseReason),
}

/// Forwards every notification into a bounded channel. A full channel
/// holds the session back until the receiver catches up.
#[async_trait]
impl SessionHandler for mpsc::Sender<SessionEvent> {
    async fn on_open(&mut self) {
        forward(self, SessionEvent::Open).await;
    }

    async fn on_output(&mut self, data: Bytes) {
        forward(self, SessionEvent::Output(data)).await;
    }

    async fn on_system_message(&mut self, data: Bytes) {
        forward(self, SessionEvent::SystemMessage(data)).await;
    }

    async fn on_unknown(&mut self, raw: Bytes) {
        forward(self, SessionEvent::Unknown(raw)).await;
    }

    async fn on_close(&mut self, reason: CloseReason) {
        forward(self, SessionEvent::Close(reason)).await;
    }

    async fn on_error(&mut self, error: SessionError) {
        forward(self, SessionEvent::Error(error)).await;
    }
}

/// Deliver `event` to the matching handler method.
pub(crate) async fn dispatch<H: SessionHandler>(handler: &mut H, event: SessionEvent) {
    match event {
        SessionEvent::Open => handler.on_open().await,
        SessionEvent::Output(data) => handler.on_output(data).await,
        SessionEvent::SystemMessage(data) => handler.on_system_message(data).await,
        SessionEvent::Unknown(raw) => handler.on_unknown(raw).await,
        SessionEvent::Error(error) => handler.on_error(error).await,
        SessionEvent::Close(reason) => handler.on_close(reason).await,
    }
}

async fn forward(tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if tx.send(event).await.is_err() {
        trace!("session event receiver dropped");
    }
}
