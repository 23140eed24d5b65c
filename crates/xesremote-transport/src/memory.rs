//! In-memory transport pair.
//!
//! [`MemoryTransport`] is handed to the session like any other transport;
//! the matching [`RemoteEnd`] plays the backend: it decides when the
//! connection opens, injects inbound messages, errors and the close event,
//! and observes every outbound text message in order.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{CloseReason, Transport, TransportEvent, UpgradeInfo};

/// Create a connected transport / remote-end pair.
pub fn memory_pair() -> (MemoryTransport, RemoteEnd) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            events: event_rx,
            outbound: Some(outbound_tx),
            open: false,
            close_requested: false,
            finished: false,
        },
        RemoteEnd {
            events: event_tx,
            outbound: outbound_rx,
        },
    )
}

/// Local half of an in-memory connection.
#[derive(Debug)]
pub struct MemoryTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    open: bool,
    close_requested: bool,
    finished: bool,
}

impl MemoryTransport {
    fn finish(&mut self, reason: CloseReason) -> Option<TransportEvent> {
        self.finished = true;
        self.open = false;
        self.outbound = None;
        Some(TransportEvent::Close(reason))
    }

    fn observe(&mut self, event: TransportEvent) -> Option<TransportEvent> {
        match event {
            TransportEvent::Open(info) => {
                self.open = true;
                Some(TransportEvent::Open(info))
            }
            TransportEvent::Close(reason) => self.finish(reason),
            other => Some(other),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.finished {
            return None;
        }

        if self.close_requested {
            // Anything the remote queued before our close still arrives first.
            return match self.events.try_recv() {
                Ok(event) => self.observe(event),
                Err(_) => self.finish(CloseReason::normal()),
            };
        }

        match self.events.recv().await {
            Some(event) => self.observe(event),
            None => self.finish(CloseReason::abnormal("remote end dropped")),
        }
    }

    async fn send(&mut self, text: String) -> Result<()> {
        if !self.open || self.close_requested {
            return Err(TransportError::Closed);
        }
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound.send(text).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.close_requested && !self.finished {
            debug!("closing in-memory transport");
            self.close_requested = true;
            self.outbound = None;
        }
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

/// Remote half of an in-memory connection.
#[derive(Debug)]
pub struct RemoteEnd {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl RemoteEnd {
    /// Complete the connection with the given upgrade metadata.
    pub fn open(&self, info: UpgradeInfo) {
        self.push(TransportEvent::Open(info));
    }

    /// Complete the connection with no upgrade headers.
    pub fn open_default(&self) {
        self.open(UpgradeInfo::new());
    }

    /// Deliver one inbound text message.
    pub fn send_text(&self, text: impl Into<String>) {
        self.push(TransportEvent::Message(text.into()));
    }

    /// Report a connection-level error.
    pub fn error(&self, err: TransportError) {
        self.push(TransportEvent::Error(err));
    }

    /// Close the connection from the remote side.
    pub fn close(&self, reason: CloseReason) {
        self.push(TransportEvent::Close(reason));
    }

    /// Wait for the next outbound message. `None` once the local side has
    /// closed and everything it sent has been read.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    fn push(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("in-memory transport dropped; event discarded");
        }
    }
}
