//! Shared helpers for integration tests: a scriptable fake IRC server
//! and event-channel utilities.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use slirc_ops::event::EventReceiver;
use slirc_ops::EventKind;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a tracing subscriber once per test binary. `RUST_LOG` controls
/// the filter; the default stays quiet unless a test fails under `--nocapture`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A fake IRC server bound to an ephemeral loopback port.
pub struct FakeIrcServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl FakeIrcServer {
    pub async fn spawn() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        Self { listener, addr }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Accept the next client connection.
    pub async fn accept(&self) -> FakeIrcPeer {
        let (stream, _) = tokio::time::timeout(IO_TIMEOUT, self.listener.accept())
            .await
            .expect("accept timed out")
            .expect("accept failed");
        let (read, write) = stream.into_split();
        FakeIrcPeer {
            reader: BufReader::new(read),
            writer: write,
        }
    }
}

/// Server side of one accepted connection.
pub struct FakeIrcPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl FakeIrcPeer {
    /// Read the next CRLF-terminated line from the client.
    pub async fn expect_line(&mut self) -> String {
        let mut line = String::new();
        let n = tokio::time::timeout(IO_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("read timed out")
            .expect("read failed");
        assert!(n > 0, "client closed the connection");
        line.trim_end_matches(['\r', '\n']).to_owned()
    }

    /// Assert that no line arrives from the client within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        let mut line = String::new();
        match tokio::time::timeout(window, self.reader.read_line(&mut line)).await {
            Err(_) => {}
            Ok(Ok(0)) => {}
            Ok(_) => panic!("unexpected line from client: {line:?}"),
        }
    }

    /// Send one line to the client, CRLF-terminated.
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write failed");
    }
}

/// Wait for the next Status event, skipping everything else.
pub async fn next_status(rx: &mut EventReceiver) -> String {
    loop {
        let event = tokio::time::timeout(IO_TIMEOUT, rx.recv())
            .await
            .expect("no event within timeout")
            .expect("event channel closed");
        if let EventKind::Status(text) = event.kind {
            return text;
        }
    }
}

/// Wait until a Status event with exactly `expected` arrives.
pub async fn await_status(rx: &mut EventReceiver, expected: &str) {
    loop {
        if next_status(rx).await == expected {
            return;
        }
    }
}
