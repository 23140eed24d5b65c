//! WebSocket client transport.
//!
//! Thin wrapper around `tokio-tungstenite`. The connection is not attempted
//! until the owner first polls [`Transport::next_event`], so construction is
//! cheap and infallible; a bad URL or refused connection shows up as an
//! `Error` event followed by `Close`.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{CloseReason, Transport, TransportEvent, UpgradeInfo, CLOSE_NO_STATUS};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

enum WsState {
    /// Not connected yet.
    Pending,
    Connected(Box<WsStream>),
    /// Close has been (or is queued to be) delivered.
    Done,
}

/// WebSocket transport for a single `ws://` or `wss://` endpoint.
pub struct WsTransport {
    url: String,
    state: WsState,
    queued: VecDeque<TransportEvent>,
    close_requested: bool,
}

impl WsTransport {
    /// Create a transport for `url`. No I/O happens until the first event is polled.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: WsState::Pending,
            queued: VecDeque::new(),
            close_requested: false,
        }
    }

    /// The endpoint this transport connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&mut self) -> TransportEvent {
        let request = match self.url.as_str().into_client_request() {
            Ok(request) => request,
            Err(err) => {
                return self.fail(TransportError::InvalidUrl {
                    url: self.url.clone(),
                    reason: err.to_string(),
                })
            }
        };

        match tokio_tungstenite::connect_async(request).await {
            Ok((stream, response)) => {
                let mut info = UpgradeInfo::new();
                for (name, value) in response.headers() {
                    info.insert(name.as_str(), value.as_bytes());
                }
                debug!(url = %self.url, status = %response.status(), "websocket connected");
                self.state = WsState::Connected(Box::new(stream));
                TransportEvent::Open(info)
            }
            Err(err) => self.fail(TransportError::Connect {
                url: self.url.clone(),
                source: err,
            }),
        }
    }

    /// Report `err` now and close on the following poll.
    fn fail(&mut self, err: TransportError) -> TransportEvent {
        debug!(url = %self.url, error = %err, "websocket failed");
        self.state = WsState::Done;
        self.queued
            .push_back(TransportEvent::Close(CloseReason::abnormal(err.to_string())));
        TransportEvent::Error(err)
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            WsState::Pending => "pending",
            WsState::Connected(_) => "connected",
            WsState::Done => "done",
        };
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("state", &state)
            .field("close_requested", &self.close_requested)
            .finish()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }

        match self.state {
            WsState::Done => return None,
            WsState::Pending if self.close_requested => {
                self.state = WsState::Done;
                return Some(TransportEvent::Close(CloseReason::normal()));
            }
            WsState::Pending => return Some(self.connect().await),
            WsState::Connected(_) => {}
        }
        let WsState::Connected(stream) = &mut self.state else {
            return None;
        };

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "websocket text message");
                    return Some(TransportEvent::Message(text.to_string()));
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "websocket binary message (decoded as UTF-8)");
                    return Some(TransportEvent::Message(
                        String::from_utf8_lossy(&data).into_owned(),
                    ));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|cf| CloseReason::new(cf.code.into(), cf.reason.to_string()))
                        .unwrap_or_else(|| CloseReason::new(CLOSE_NO_STATUS, ""));
                    debug!(%reason, "websocket closed by peer");
                    self.state = WsState::Done;
                    return Some(TransportEvent::Close(reason));
                }
                // Pings are answered by tungstenite; pongs and raw frames carry nothing for us.
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed))
                | None => {
                    self.state = WsState::Done;
                    return Some(TransportEvent::Close(CloseReason::abnormal("stream ended")));
                }
                Some(Err(err)) => return Some(self.fail(TransportError::WebSocket(err))),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<()> {
        if self.close_requested {
            return Err(TransportError::Closed);
        }
        let WsState::Connected(stream) = &mut self.state else {
            return Err(TransportError::Closed);
        };

        // `SinkExt::send` flushes, so this resolves once the frame has left the buffer.
        match stream.send(Message::Text(text.into())).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                Err(TransportError::Closed)
            }
            Err(err) => Err(TransportError::WebSocket(err)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.close_requested {
            return Ok(());
        }
        self.close_requested = true;

        if let WsState::Connected(stream) = &mut self.state {
            debug!(url = %self.url, "closing websocket");
            // The inherent close sends a close frame; `SinkExt::close` would only flush.
            match tokio_tungstenite::WebSocketStream::close(&mut **stream, None).await {
                Ok(())
                | Err(tungstenite::Error::ConnectionClosed)
                | Err(tungstenite::Error::AlreadyClosed) => {}
                Err(err) => return Err(TransportError::WebSocket(err)),
            }
        }
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "websocket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_reports_error_then_close() {
        let mut transport = WsTransport::new("not a url");

        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Error(TransportError::InvalidUrl { .. }))
        ));
        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Close(reason)) if !reason.is_normal()
        ));
        assert!(transport.next_event().await.is_none());
    }

    #[tokio::test]
    async fn close_before_connect_skips_connection() {
        let mut transport = WsTransport::new("ws://127.0.0.1:9/never");
        transport.close().await.unwrap();

        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Close(reason)) if reason.is_normal()
        ));
        assert!(transport.next_event().await.is_none());
        assert!(matches!(
            transport.send("1x".to_string()).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn connect_refused_reports_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = WsTransport::new(format!("ws://{addr}/run"));
        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Error(TransportError::Connect { .. }))
        ));
        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Close(_))
        ));
    }

    #[tokio::test]
    async fn loopback_send_and_close_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut texts = Vec::new();
            let mut saw_close = false;
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => texts.push(text.to_string()),
                    Message::Close(_) => saw_close = true,
                    _ => {}
                }
            }
            (texts, saw_close)
        });

        let mut transport = WsTransport::new(format!("ws://{addr}/run"));
        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Open(_))
        ));
        transport.send("1hi".to_string()).await.unwrap();
        transport.close().await.unwrap();
        assert!(matches!(
            transport.next_event().await,
            Some(TransportEvent::Close(_))
        ));

        let (texts, saw_close) = server.await.unwrap();
        assert_eq!(texts, ["1hi"]);
        assert!(saw_close, "peer should receive a close frame");
    }

    #[test]
    fn debug_does_not_require_connection() {
        let transport = WsTransport::new("wss://example.invalid/ws");
        let rendered = format!("{transport:?}");
        assert!(rendered.contains("pending"));
        assert_eq!(transport.url(), "wss://example.invalid/ws");
        assert_eq!(transport.transport_name(), "websocket");
    }
}
