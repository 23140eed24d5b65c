use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use xesremote_frame::{
    decode_frame, encode_input, encode_liveness, encode_run_request, tag_name, FrameKind,
    RunRequest, HANDSHAKE_PRIMER,
};
use xesremote_transport::{CloseReason, Transport, TransportError, TransportEvent, UpgradeInfo};

use crate::config::{SessionConfig, UNKNOWN_HOST};
use crate::echo::EchoGate;
use crate::error::{Result, SessionError};
use crate::handler::{dispatch, SessionEvent, SessionHandler};
use crate::liveness::{next_tick, LivenessTimer};
use crate::state::SessionState;

enum Command {
    Send {
        text: String,
        done: oneshot::Sender<Result<()>>,
    },
}

/// Handle to one running session.
///
/// Constructing a session spawns its driver task and starts connecting
/// right away; there is no separate start call. All constructors must be
/// called from within a Tokio runtime.
///
/// Dropping the handle closes the session.
#[derive(Debug)]
pub struct Session {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    host: watch::Receiver<Option<String>>,
}

impl Session {
    /// Connect to the default backend endpoint.
    #[cfg(feature = "ws")]
    pub fn connect<H: SessionHandler>(request: RunRequest, handler: H) -> Self {
        Self::connect_with_config(request, handler, SessionConfig::default())
    }

    /// Connect over WebSocket to `config.endpoint`.
    #[cfg(feature = "ws")]
    pub fn connect_with_config<H: SessionHandler>(
        request: RunRequest,
        handler: H,
        config: SessionConfig,
    ) -> Self {
        let transport = xesremote_transport::WsTransport::new(config.endpoint.clone());
        Self::with_transport(request, transport, handler, config)
    }

    /// Run a session over an arbitrary transport.
    pub fn with_transport<T, H>(
        request: RunRequest,
        transport: T,
        handler: H,
        config: SessionConfig,
    ) -> Self
    where
        T: Transport,
        H: SessionHandler,
    {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let (host_tx, host_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let driver = Driver {
            gate: EchoGate::new(request.echo),
            request,
            handler,
            host_tx,
            commands: command_rx,
            link: Link {
                transport,
                config,
                state: SessionState::Connecting,
                state_tx,
                liveness: None,
                cancel: cancel.clone(),
                close_requested: false,
            },
        };
        tokio::spawn(driver.run());

        Self {
            commands: command_tx,
            cancel,
            state: state_rx,
            host: host_rx,
        }
    }

    /// Send `text` to the remote program as input.
    ///
    /// Empty text is a no-op. Input sent before the connection is open waits
    /// until it is. Resolves once the frame has been handed to the network,
    /// so a fast producer is paced by the connection.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] once the session is closing, closed or
    /// failed; [`SessionError::Transport`] if the write itself failed.
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if self.cancel.is_cancelled() || self.state().is_shutting_down() {
            return Err(SessionError::Closed);
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                text: text.to_owned(),
                done: done_tx,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        done_rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Close the session. Resolves once the transport has been asked to
    /// close. Calling it again, or after the connection is gone, does nothing.
    pub async fn close(&self) {
        self.cancel.cancel();
        let mut state = self.state.clone();
        // An error here means the driver already finished.
        let _ = state.wait_for(|s| s.is_shutting_down()).await;
    }

    /// Identifier of the backend node serving this session, taken from the
    /// transport upgrade response. Waits for the connection to open; the
    /// value is cached for the life of the session.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session ended before the connection
    /// ever opened.
    pub async fn host(&self) -> Result<String> {
        let mut host = self.host.clone();
        // Fails only once the driver is gone; the last value still stands.
        let _ = host.wait_for(Option::is_some).await;
        let value = host.borrow().clone();
        value.ok_or(SessionError::Closed)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session has fully finished and its close notification
    /// has been delivered.
    pub async fn wait_closed(&self) {
        let mut state = self.state.clone();
        while state.changed().await.is_ok() {}
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Owns the handler and everything that feeds it.
struct Driver<T, H> {
    request: RunRequest,
    handler: H,
    gate: EchoGate,
    host_tx: watch::Sender<Option<String>>,
    commands: mpsc::Receiver<Command>,
    link: Link<T>,
}

/// The transport and the state machine. Kept apart from the handler so a
/// close request can be served while a handler call is still pending.
struct Link<T> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    liveness: Option<LivenessTimer>,
    cancel: CancellationToken,
    close_requested: bool,
}

impl<T: Transport> Link<T> {
    /// The only place `state` changes. Leaving `Open` releases the liveness
    /// timer; entering it acquires one.
    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
        self.liveness = match next {
            SessionState::Open => {
                let timer = LivenessTimer::start(self.config.liveness_interval);
                debug!(period = ?timer.period(), "liveness started");
                Some(timer)
            }
            _ => None,
        };
        self.state_tx.send_replace(next);
    }

    async fn request_close(&mut self) {
        self.close_requested = true;
        if matches!(self.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        debug!(state = %self.state, "close requested");
        if self.state != SessionState::Failed {
            self.transition(SessionState::Closing);
        }
        if let Err(err) = self.transport.close().await {
            warn!(error = %err, "transport close failed");
        }
    }

    async fn send_liveness(&mut self) {
        match self.transport.send(encode_liveness()).await {
            Ok(()) => trace!("liveness frame sent"),
            // The transport reports the underlying failure through its own events.
            Err(err) => warn!(error = %err, "liveness frame not sent"),
        }
    }
}

impl<T: Transport, H: SessionHandler> Driver<T, H> {
    async fn run(mut self) {
        debug!(
            transport = self.link.transport.transport_name(),
            lang = %self.request.language,
            echo = self.gate.echo_enabled(),
            "session starting"
        );

        loop {
            let accepting_commands = self.link.state != SessionState::Connecting;
            tokio::select! {
                biased;
                _ = self.link.cancel.cancelled(), if !self.link.close_requested => {
                    self.link.request_close().await;
                }
                event = self.link.transport.next_event() => match event {
                    Some(TransportEvent::Open(info)) => self.on_transport_open(info).await,
                    Some(TransportEvent::Message(text)) => self.on_message(&text).await,
                    Some(TransportEvent::Error(err)) => self.on_transport_error(err).await,
                    Some(TransportEvent::Close(reason)) => {
                        self.on_transport_close(reason).await;
                        break;
                    }
                    None => {
                        self.on_transport_close(CloseReason::abnormal("transport ended")).await;
                        break;
                    }
                },
                Some(command) = self.commands.recv(), if accepting_commands => {
                    self.on_command(command).await;
                }
                _ = next_tick(self.link.liveness.as_mut()) => self.link.send_liveness().await,
            }
        }

        debug!("session finished");
    }

    /// Hand `event` to the handler. A close requested while the handler is
    /// still busy is carried out first; delivery then completes.
    async fn notify(&mut self, event: SessionEvent) {
        let delivery = dispatch(&mut self.handler, event);
        tokio::pin!(delivery);

        if !self.link.close_requested {
            tokio::select! {
                biased;
                () = &mut delivery => return,
                () = self.link.cancel.cancelled() => self.link.request_close().await,
            }
        }
        delivery.await;
    }

    async fn on_transport_open(&mut self, info: UpgradeInfo) {
        if self.link.state != SessionState::Connecting {
            debug!(state = %self.link.state, "transport opened while shutting down; skipping handshake");
            return;
        }

        let host = host_from_upgrade(&info, &self.link.config.host_header);
        debug!(%host, "transport open");
        self.host_tx.send_replace(Some(host));

        let handshake = self.handshake().await;
        self.link.transition(SessionState::AwaitingReady);
        if let Err(err) = handshake {
            warn!(error = %err, "handshake failed");
            self.notify(SessionEvent::Error(err)).await;
        }
    }

    async fn handshake(&mut self) -> Result<()> {
        let run = encode_run_request(&self.request)?;
        let transport = &mut self.link.transport;
        transport.send(HANDSHAKE_PRIMER.to_string()).await?;
        transport.send(run).await?;
        trace!("handshake sent");
        Ok(())
    }

    async fn on_message(&mut self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(
                    tag = tag_name(text.as_bytes().first().copied()),
                    len = text.len(),
                    error = %err,
                    "dropping malformed frame"
                );
                self.notify(SessionEvent::Error(SessionError::Protocol(err))).await;
                return;
            }
        };
        trace!(kind = ?frame.kind, len = frame.payload.len(), "frame received");

        match frame.kind {
            FrameKind::ReadySignal if self.link.state == SessionState::AwaitingReady => {
                self.link.transition(SessionState::Open);
                self.notify(SessionEvent::Open).await;
            }
            FrameKind::ReadySignal => {
                debug!(state = %self.link.state, "ignoring ready signal");
            }
            FrameKind::Liveness => {}
            FrameKind::Output => {
                if self.gate.should_suppress() {
                    trace!(len = frame.payload.len(), "suppressed echo of local input");
                } else {
                    self.notify(SessionEvent::Output(frame.payload)).await;
                }
            }
            FrameKind::SystemMessage => {
                self.notify(SessionEvent::SystemMessage(frame.payload)).await
            }
            FrameKind::Unknown => self.notify(SessionEvent::Unknown(frame.payload)).await,
            FrameKind::Input | FrameKind::RunRequest => {
                debug!(kind = ?frame.kind, "ignoring outbound-only frame kind");
            }
        }
    }

    async fn on_transport_error(&mut self, err: TransportError) {
        warn!(error = %err, "transport error");
        self.link.transition(SessionState::Failed);
        self.notify(SessionEvent::Error(SessionError::Transport(err))).await;
    }

    async fn on_transport_close(&mut self, reason: CloseReason) {
        if self.link.state != SessionState::Failed {
            self.link.transition(SessionState::Closing);
        }
        self.link.transition(SessionState::Closed);
        debug!(%reason, "transport closed");
        self.notify(SessionEvent::Close(reason)).await;
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Send { text, done } => {
                let result = if self.link.state.is_transport_open() {
                    trace!(len = text.len(), "sending input");
                    let link = &mut self.link;
                    tokio::select! {
                        biased;
                        _ = link.cancel.cancelled() => Err(SessionError::Closed),
                        sent = link.transport.send(encode_input(&text)) => sent.map_err(SessionError::from),
                    }
                } else {
                    Err(SessionError::Closed)
                };
                // Only a frame that actually went out can be echoed back.
                if result.is_ok() {
                    self.gate.on_local_send();
                }
                let _ = done.send(result);
            }
        }
    }
}

fn host_from_upgrade(info: &UpgradeInfo, header: &str) -> String {
    info.header(header)
        .and_then(|value| std::str::from_utf8(value).ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_HOST)
        .to_string()
}
