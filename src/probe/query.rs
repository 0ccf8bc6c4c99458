//! One-shot line-protocol query.
//!
//! Connect, send a single CRLF-terminated payload, and collect whatever
//! the service replies until it closes the stream or the deadline passes.
//! Useful against banners, HTTP HEAD, IRC pre-registration errors, and
//! similar chatty line protocols.

use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

/// Send `payload` to `host:port` and return the raw reply text.
pub async fn query(
    cfg: &ProbeConfig,
    host: &str,
    port: u16,
    payload: &str,
) -> Result<String, ProbeError> {
    let addr = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ProbeError::Resolve(e.to_string()))?
        .next()
        .ok_or_else(|| ProbeError::Resolve(format!("no addresses for {host}")))?;

    let deadline = Instant::now() + cfg.query_timeout();
    let mut stream = match tokio::time::timeout(cfg.query_timeout(), TcpStream::connect(addr)).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            return Err(ProbeError::Refused);
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(ProbeError::Timeout),
    };

    stream.write_all(payload.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;

    // Read until EOF or deadline; a slow talker yields what it managed.
    let mut collected = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => collected.extend_from_slice(&chunk[..n]),
            Ok(Err(_)) | Err(_) => break,
        }
    }

    Ok(String::from_utf8_lossy(&collected).into_owned())
}
