//! Connection lifecycle for one IRC session.
//!
//! [`Connection`] owns the socket half of a session: it dials the server,
//! performs registration, runs the receive task, and exposes the small set
//! of outbound commands the console issues. All derived state lives in the
//! [`Session`] dispatcher, which runs inside the receive task; the rest of
//! the program observes it through the event channel only.
//!
//! A `Connection` is one-shot. Disconnecting cancels its token and drops
//! the writer; reconnecting means building a new `Connection`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use slirc_wire::LineCodec;

use crate::config::{AuthMethod, ConnectParams, RatePolicy, ServicesConfig};
use crate::dispatch::{Action, Session};
use crate::event::{Event, EventKind, EventSender};

/// Dial timeout for the initial TCP connect.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(12);

type Writer = SplitSink<Framed<TcpStream, LineCodec>, String>;
type Reader = SplitStream<Framed<TcpStream, LineCodec>>;

/// Requests routed into the receive task, which owns the [`Session`].
enum Control {
    /// Reset the channel list ahead of an outgoing LIST.
    PrepareList,
}

/// Handle to one live (or torn-down) IRC connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    label: String,
    services: ServicesConfig,
    events: EventSender,
    connected: AtomicBool,
    writer: Mutex<Option<Writer>>,
    cancel: CancellationToken,
    control: mpsc::UnboundedSender<Control>,
    /// Pre-built identify line, sent after a delay once 001 arrives.
    identify: Option<String>,
}

impl Connection {
    /// Dial `params.host:params.port`, register, and spawn the receive
    /// task. Connection status is reported on the event channel; the
    /// returned error mirrors the emitted "Connect failed" status.
    pub async fn connect(
        params: &ConnectParams,
        label: impl Into<String>,
        rate: RatePolicy,
        services: ServicesConfig,
        events: EventSender,
    ) -> std::io::Result<Self> {
        let label = label.into();
        let dialed =
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((params.host.as_str(), params.port)))
                .await
                .unwrap_or_else(|_| {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connection timed out",
                    ))
                });
        let stream = match dialed {
            Ok(stream) => stream,
            Err(e) => {
                let _ = events.send(Event {
                    label,
                    kind: EventKind::Status(format!("Connect failed: {e}")),
                });
                return Err(e);
            }
        };

        let (writer, reader) = Framed::new(stream, LineCodec::new()).split::<String>();
        let cancel = CancellationToken::new();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let identify = match params.auth {
            AuthMethod::Services => params.credentials.as_ref().map(|creds| {
                format!("PRIVMSG {} :IDENTIFY {}", services.nick, creds.password)
            }),
            AuthMethod::PassPreRegistration => None,
        };

        let inner = Arc::new(Inner {
            label: label.clone(),
            services: services.clone(),
            events: events.clone(),
            connected: AtomicBool::new(true),
            writer: Mutex::new(Some(writer)),
            cancel,
            control: control_tx,
            identify,
        });

        inner.status("Connected. Registering…");
        if params.auth == AuthMethod::PassPreRegistration {
            if let Some(creds) = &params.credentials {
                inner
                    .send_raw(&format!("PASS {};{}", creds.account, creds.password))
                    .await;
            }
        }
        inner.send_raw(&format!("NICK {}", params.nick)).await;
        inner
            .send_raw(&format!("USER {} 0 * :{}", params.nick, params.realname))
            .await;

        let session = Session::new(&label, &params.nick, rate, services, events);
        Inner::spawn_rx(Arc::clone(&inner), reader, control_rx, session);

        Ok(Self { inner })
    }

    /// Label this connection reports events under.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the socket is still usable.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Send a raw protocol line. Silently dropped when disconnected; a
    /// write failure tears the connection down.
    pub async fn send_raw(&self, line: &str) {
        self.inner.send_raw(line).await;
    }

    /// Best-effort QUIT, then tear down.
    pub async fn disconnect(&self) {
        self.inner.teardown(true).await;
    }

    /// PRIVMSG `target`.
    pub async fn privmsg(&self, target: &str, text: &str) {
        self.send_raw(&format!("PRIVMSG {target} :{text}")).await;
    }

    /// JOIN a channel, prepending `#` when the caller omitted it.
    pub async fn join(&self, channel: &str) {
        if channel.is_empty() {
            return;
        }
        if channel.starts_with('#') {
            self.send_raw(&format!("JOIN {channel}")).await;
        } else {
            self.send_raw(&format!("JOIN #{channel}")).await;
        }
    }

    /// Request a roster refresh for `channel`.
    pub async fn names(&self, channel: &str) {
        if !channel.is_empty() {
            self.send_raw(&format!("NAMES {channel}")).await;
        }
    }

    /// WHOIS `nick`; the result arrives as a single aggregated event.
    pub async fn whois(&self, nick: &str) {
        if !nick.is_empty() {
            self.send_raw(&format!("WHOIS {nick}")).await;
        }
    }

    /// KICK `nick` from `channel`.
    pub async fn kick(&self, channel: &str, nick: &str, reason: &str) {
        self.send_raw(&format!("KICK {channel} {nick} :{reason}")).await;
    }

    /// Apply a mode string to a channel or nick.
    pub async fn mode(&self, target: &str, modes: &str) {
        self.send_raw(&format!("MODE {target} {modes}")).await;
    }

    /// Start a fresh LIST: the accumulated channel table is reset before
    /// the request goes out so stale rows never mix with new ones.
    pub async fn list(&self) {
        let _ = self.inner.control.send(Control::PrepareList);
        self.send_raw("LIST").await;
    }

    /// Identify to services with an explicit password.
    pub async fn identify(&self, password: &str) {
        self.privmsg(&self.inner.services.nick, &format!("IDENTIFY {password}"))
            .await;
    }

    /// Send an arbitrary services subcommand (GHOST, RELEASE, ...).
    pub async fn nickserv(&self, command: &str) {
        self.privmsg(&self.inner.services.nick, command).await;
    }
}

impl Inner {
    fn status(&self, text: impl Into<String>) {
        let _ = self.events.send(Event {
            label: self.label.clone(),
            kind: EventKind::Status(text.into()),
        });
    }

    async fn send_raw(self: &Arc<Self>, line: &str) {
        if !self.connected.load(Ordering::SeqCst) {
            return;
        }
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return;
        };
        if let Err(e) = writer.send(line.to_owned()).await {
            self.status(format!("Send failed: {e}"));
            drop(guard);
            // The socket is already broken; skip the QUIT courtesy.
            self.teardown(false).await;
        }
    }

    async fn teardown(&self, send_quit: bool) {
        self.cancel.cancel();
        let mut guard = self.writer.lock().await;
        if send_quit && self.connected.load(Ordering::SeqCst) {
            if let Some(writer) = guard.as_mut() {
                let _ = writer.send("QUIT :disconnect".to_owned()).await;
            }
        }
        guard.take();
        drop(guard);
        self.connected.store(false, Ordering::SeqCst);
        self.status("Disconnected.");
    }

    /// After 001, wait out the configured delay and identify to services.
    /// A disconnect in the meantime cancels the pending identify.
    fn schedule_identify(self: &Arc<Self>) {
        let Some(line) = self.identify.clone() else {
            return;
        };
        let delay = self.services.identify_delay();
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => {
                    debug!(label = %inner.label, "identify cancelled by disconnect");
                }
                _ = tokio::time::sleep(delay) => {
                    inner.send_raw(&line).await;
                }
            }
        });
    }

    fn spawn_rx(
        inner: Arc<Self>,
        mut reader: Reader,
        mut control: mpsc::UnboundedReceiver<Control>,
        mut session: Session,
    ) {
        tokio::spawn(async move {
            loop {
                // Control requests are ordered before socket data so a
                // LIST reset lands ahead of the rows it applies to.
                tokio::select! {
                    biased;
                    _ = inner.cancel.cancelled() => break,
                    req = control.recv() => match req {
                        Some(Control::PrepareList) => session.prepare_list(),
                        None => break,
                    },
                    frame = reader.next() => {
                        let line = match frame {
                            Some(Ok(line)) => line,
                            Some(Err(e)) => {
                                warn!(label = %inner.label, error = %e, "read error");
                                break;
                            }
                            None => break,
                        };
                        for action in session.handle_line(&line, Instant::now()) {
                            match action {
                                Action::Send(out) => inner.send_raw(&out).await,
                                Action::Registered => inner.schedule_identify(),
                            }
                        }
                    }
                }
            }
            inner.connected.store(false, Ordering::SeqCst);
            inner.status("Connection closed.");
        });
    }
}
