//! TCP connect scanner with banner grabbing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::probe::{ProbeReport, ProbeSender};

/// Well-known service ports offered by the `common` port spec.
pub const COMMON_PORTS: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (6667, "IRC"),
    (6697, "IRC-SSL"),
    (8000, "HTTP-Alt"),
    (8080, "HTTP-Proxy"),
    (8443, "HTTPS-Alt"),
    (8888, "HTTP-Alt2"),
    (9090, "Web-Console"),
    (27017, "MongoDB"),
];

/// Maximum banner length kept after trimming.
const BANNER_MAX: usize = 80;

/// Service name for a port, or `"unknown"`.
pub fn service_name(port: u16) -> &'static str {
    COMMON_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

/// Parse a port spec: `common`, a comma list (`80,443,8080`), or an
/// inclusive range (`1-1024`).
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>, ProbeError> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("common") {
        return Ok(COMMON_PORTS.iter().map(|(p, _)| *p).collect());
    }
    if spec.contains('-') && !spec.contains(',') {
        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| ProbeError::BadPortSpec(spec.to_owned()))?;
        let start: u16 = start
            .trim()
            .parse()
            .map_err(|_| ProbeError::BadPortSpec(spec.to_owned()))?;
        let end: u16 = end
            .trim()
            .parse()
            .map_err(|_| ProbeError::BadPortSpec(spec.to_owned()))?;
        if start == 0 || end < start {
            return Err(ProbeError::BadPortSpec(spec.to_owned()));
        }
        return Ok((start..=end).collect());
    }
    let mut ports = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        ports.push(
            part.parse()
                .map_err(|_| ProbeError::BadPortSpec(spec.to_owned()))?,
        );
    }
    if ports.is_empty() {
        return Err(ProbeError::BadPortSpec(spec.to_owned()));
    }
    Ok(ports)
}

/// Outcome of probing one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Connect succeeded.
    Open,
    /// Connect was actively refused.
    Closed,
    /// Connect timed out (likely dropped by a filter).
    Filtered,
    /// Connect failed some other way.
    Error,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortState::Open => "OPEN",
            PortState::Closed => "CLOSED",
            PortState::Filtered => "FILTERED",
            PortState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One row of a scan result.
#[derive(Debug, Clone)]
pub struct PortReport {
    /// Probed port.
    pub port: u16,
    /// Classified outcome.
    pub state: PortState,
    /// Well-known service name, or `"unknown"`.
    pub service: &'static str,
    /// First bytes the service volunteered, or the error text for
    /// [`PortState::Error`].
    pub banner: String,
}

/// Probe a single port and classify the result.
pub async fn scan_port(host: &str, port: u16, timeout: Duration) -> PortReport {
    let service = service_name(port);
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => PortReport {
            port,
            state: PortState::Open,
            service,
            banner: grab_banner(stream, timeout).await,
        },
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => PortReport {
            port,
            state: PortState::Closed,
            service,
            banner: String::new(),
        },
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => PortReport {
            port,
            state: PortState::Filtered,
            service,
            banner: String::new(),
        },
        Ok(Err(e)) => PortReport {
            port,
            state: PortState::Error,
            service,
            banner: e.to_string(),
        },
        Err(_) => PortReport {
            port,
            state: PortState::Filtered,
            service,
            banner: String::new(),
        },
    }
}

/// Poke an open connection and keep whatever greeting comes back.
async fn grab_banner(mut stream: TcpStream, timeout: Duration) -> String {
    let mut buf = [0u8; 256];
    let read = async {
        stream.write_all(b"\r\n").await?;
        stream.read(&mut buf).await
    };
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(n)) if n > 0 => {
            let banner = String::from_utf8_lossy(&buf[..n]);
            banner.trim().chars().take(BANNER_MAX).collect()
        }
        _ => String::new(),
    }
}

/// Scan `ports` on `host` with bounded concurrency, streaming each row to
/// `progress` as it lands. The returned rows are sorted by port.
pub async fn scan_ports(
    host: &str,
    ports: &[u16],
    cfg: &ProbeConfig,
    progress: Option<ProbeSender>,
) -> Vec<PortReport> {
    let permits = Arc::new(Semaphore::new(cfg.scan_workers.max(1)));
    let timeout = cfg.scan_timeout();
    let mut tasks = JoinSet::new();

    for &port in ports {
        let permits = Arc::clone(&permits);
        let host = host.to_owned();
        let progress = progress.clone();
        tasks.spawn(async move {
            // Closing the semaphore is not part of this flow, so a permit
            // always arrives.
            let _permit = permits.acquire_owned().await;
            let report = scan_port(&host, port, timeout).await;
            if let Some(tx) = progress {
                let _ = tx.send(ProbeReport::ScanPort(report.clone()));
            }
            report
        });
    }

    let mut results = Vec::with_capacity(ports.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => results.push(report),
            Err(e) => debug!(error = %e, "scan worker panicked"),
        }
    }
    results.sort_by_key(|r| r.port);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(service_name(22), "SSH");
        assert_eq!(service_name(6667), "IRC");
        assert_eq!(service_name(31337), "unknown");
    }

    #[test]
    fn test_parse_common() {
        let ports = parse_port_spec("Common").unwrap();
        assert_eq!(ports.len(), COMMON_PORTS.len());
        assert_eq!(ports[0], 21);
        assert_eq!(*ports.last().unwrap(), 27017);
    }

    #[test]
    fn test_parse_comma_list() {
        assert_eq!(parse_port_spec("80, 443,8080").unwrap(), vec![80, 443, 8080]);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_port_spec("1-5").unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_port_spec("abc"),
            Err(ProbeError::BadPortSpec(_))
        ));
        assert!(matches!(
            parse_port_spec("10-2"),
            Err(ProbeError::BadPortSpec(_))
        ));
        assert!(matches!(parse_port_spec(""), Err(ProbeError::BadPortSpec(_))));
    }

    #[test]
    fn test_port_state_display() {
        assert_eq!(PortState::Open.to_string(), "OPEN");
        assert_eq!(PortState::Filtered.to_string(), "FILTERED");
    }
}
