//! Async WebSocket driver.
//!
//! One tokio task owns the socket, the reconnect timer and the
//! [`Connection`] state machine. Everything that happens to the transport is
//! serialized through that task's `select!` loop:
//!
//! ```text
//!  TransportHandle ──Command──►┌──────────────────────┐──TransportEvent──► owner
//!                              │  driver task         │
//!  WebSocket  ◄──── frames ───►│  Connection (sans-IO)│
//!                              │  reconnect timer     │
//!                              └──────────────────────┘
//! ```

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::error::{TransportError, TransportResult};
use super::state::{Connection, TransportEvent, CLOSE_ABNORMAL, CLOSE_NORMAL, RETRY_LATER};
use crate::protocol::Message;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Settings for one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// `ws://` or `wss://` address.
    pub url: String,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    /// Close code that parks the transport instead of reconnecting.
    pub retry_later_code: u16,
    pub event_buffer: usize,
}

impl TransportOptions {
    /// Options with default backoff for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            initial_backoff_secs: 1,
            max_backoff_secs: 16,
            retry_later_code: RETRY_LATER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

#[derive(Debug)]
enum Command {
    Send(Message),
    Disconnect,
    Reconnect,
    Shutdown,
}

/// Cloneable control handle for a running transport.
///
/// The driver task stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl TransportHandle {
    fn command(&self, cmd: Command) -> TransportResult<()> {
        self.tx.send(cmd).map_err(|_| TransportError::Closed)
    }

    /// Queue a message. It is written only while connected; otherwise it is
    /// dropped.
    pub fn send(&self, msg: Message) -> TransportResult<()> {
        self.command(Command::Send(msg))
    }

    /// Close the active socket. A reconnect is scheduled as for any close.
    pub fn disconnect(&self) -> TransportResult<()> {
        self.command(Command::Disconnect)
    }

    /// Connect now, skipping any pending wait.
    pub fn reconnect(&self) -> TransportResult<()> {
        self.command(Command::Reconnect)
    }

    /// Stop the transport for good.
    pub fn shutdown(&self) -> TransportResult<()> {
        self.command(Command::Shutdown)
    }
}

/// A running transport: its handle, its event stream and its task.
#[derive(Debug)]
pub struct Transport {
    handle: TransportHandle,
    events: mpsc::Receiver<TransportEvent>,
    task: JoinHandle<()>,
}

impl Transport {
    /// Spawn the driver task. The first connection attempt starts at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(options: TransportOptions) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(options.event_buffer.max(1));

        let driver = Driver {
            url: options.url,
            conn: Connection::new(
                Backoff::new(options.initial_backoff_secs, options.max_backoff_secs),
                options.retry_later_code,
            ),
            events: event_tx,
        };
        let task = tokio::spawn(driver.run(cmd_rx));

        Self {
            handle: TransportHandle { tx: cmd_tx },
            events: event_rx,
            task,
        }
    }

    /// A new handle onto this transport.
    #[must_use]
    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Next event; `None` once the task has stopped.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Shut down and wait for the task to finish.
    pub async fn stop(self) -> TransportResult<()> {
        // Already-stopped tasks reject the command; joining still works.
        let _ = self.handle.shutdown();
        drop(self.events);
        self.task.await.map_err(|e| {
            warn!("Transport task failed: {}", e);
            TransportError::Closed
        })
    }
}

/// Open a socket while still handling commands. `None` means shutdown.
async fn connect(
    url: &str,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> Option<TransportResult<Socket>> {
    let attempt = async {
        let (socket, _) = connect_async(url).await?;
        Ok::<_, TransportError>(socket)
    };
    tokio::pin!(attempt);

    loop {
        tokio::select! {
            res = &mut attempt => return Some(res),
            cmd = commands.recv() => match cmd {
                None | Some(Command::Shutdown) => return None,
                Some(Command::Send(msg)) => {
                    debug!("Not connected; dropping {:?} message", msg.kind());
                }
                Some(_) => debug!("Connection attempt in progress; ignoring command"),
            },
        }
    }
}

/// Encode `msg` and write it as one text frame.
async fn send_frame(sink: &mut SplitSink<Socket, WsMessage>, msg: &Message) -> TransportResult<()> {
    let text = msg.encode()?;
    sink.send(WsMessage::Text(text)).await?;
    Ok(())
}

enum Exit {
    Closed(Option<u16>),
    Shutdown,
}

struct Driver {
    url: String,
    conn: Connection,
    events: mpsc::Sender<TransportEvent>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut wait = Some(Duration::ZERO);

        loop {
            if !self.idle(wait, &mut commands).await {
                break;
            }

            self.conn.on_connecting();
            debug!("Connecting to {}", self.url);
            let socket = match connect(&self.url, &mut commands).await {
                None => break,
                Some(Ok(socket)) => socket,
                Some(Err(e)) => {
                    let event = self.conn.on_error(&e);
                    self.emit(event).await;
                    wait = self.closed(Some(CLOSE_ABNORMAL)).await;
                    continue;
                }
            };

            let event = self.conn.on_open();
            self.emit(event).await;

            match self.pump(socket, &mut commands).await {
                Exit::Shutdown => break,
                Exit::Closed(code) => wait = self.closed(code).await,
            }
        }

        info!("Transport stopped");
    }

    /// Wait out `wait` (forever when `None`) while handling commands.
    /// Returns false on shutdown.
    async fn idle(
        &mut self,
        wait: Option<Duration>,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> bool {
        let timer = async move {
            match wait {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return true,
                cmd = commands.recv() => match cmd {
                    None | Some(Command::Shutdown) => return false,
                    Some(Command::Reconnect) => return true,
                    Some(Command::Send(msg)) => {
                        debug!("Not connected; dropping {:?} message", msg.kind());
                    }
                    Some(Command::Disconnect) => debug!("Not connected; ignoring disconnect"),
                },
            }
        }
    }

    /// Run one open socket until it closes or the transport shuts down.
    async fn pump(
        &mut self,
        socket: Socket,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Exit {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => self.deliver(&text).await,
                    Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => self.deliver(&text).await,
                        Err(e) => {
                            let event = self.conn.on_error(&e);
                            self.emit(event).await;
                        }
                    },
                    Some(Ok(WsMessage::Close(frame))) => {
                        return Exit::Closed(frame.map(|f| u16::from(f.code)));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let event = self.conn.on_error(&TransportError::from(e));
                        self.emit(event).await;
                        return Exit::Closed(Some(CLOSE_ABNORMAL));
                    }
                    None => return Exit::Closed(Some(CLOSE_ABNORMAL)),
                },
                cmd = commands.recv() => match cmd {
                    Some(Command::Send(msg)) if !self.conn.can_send() => {
                        debug!("Not connected; dropping {:?} message", msg.kind());
                    }
                    Some(Command::Send(msg)) => {
                        if let Err(e) = send_frame(&mut sink, &msg).await {
                            warn!("Failed to send {:?} message: {}", msg.kind(), e);
                            let event = self.conn.on_error(&e);
                            self.emit(event).await;
                        }
                    }
                    Some(Command::Disconnect) => {
                        debug!("Disconnecting");
                        if let Err(e) = sink.send(WsMessage::Close(None)).await {
                            debug!("Close handshake failed: {}", e);
                        }
                        return Exit::Closed(Some(CLOSE_NORMAL));
                    }
                    Some(Command::Reconnect) => debug!("Already connected; ignoring reconnect"),
                    None | Some(Command::Shutdown) => {
                        if let Err(e) = sink.send(WsMessage::Close(None)).await {
                            debug!("Close handshake failed: {}", e);
                        }
                        return Exit::Shutdown;
                    }
                },
            }
        }
    }

    async fn deliver(&mut self, payload: &str) {
        for event in self.conn.on_data(payload) {
            self.emit(event).await;
        }
    }

    /// Handle a close and report the wait before the next attempt.
    async fn closed(&mut self, code: Option<u16>) -> Option<Duration> {
        let outcome = self.conn.on_close(code);
        if let Some(event) = outcome.event() {
            self.emit(event).await;
        }
        outcome.delay()
    }

    async fn emit(&self, event: TransportEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}
