//! TCP round-trip probe.
//!
//! Repeated timed connects against one port. No ICMP involved, so this
//! works unprivileged; an actively refused connect still measures a full
//! round trip and counts as received.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

/// Result of one RTT run.
#[derive(Debug, Clone)]
pub struct RttReport {
    /// Host as given by the caller.
    pub host: String,
    /// Resolved address that was probed.
    pub addr: SocketAddr,
    /// Per-attempt round-trip times; `None` marks a timeout or error.
    pub samples: Vec<Option<Duration>>,
}

impl RttReport {
    /// Number of probes sent.
    pub fn sent(&self) -> usize {
        self.samples.len()
    }

    /// Number of probes that completed a round trip.
    pub fn received(&self) -> usize {
        self.samples.iter().flatten().count()
    }

    /// Share of lost probes, 0.0 to 100.0.
    pub fn loss_percent(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let lost = self.sent() - self.received();
        lost as f64 * 100.0 / self.sent() as f64
    }

    /// Fastest successful round trip.
    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().flatten().min().copied()
    }

    /// Slowest successful round trip.
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().flatten().max().copied()
    }

    /// Mean over successful round trips.
    pub fn avg(&self) -> Option<Duration> {
        let received = self.received() as u32;
        if received == 0 {
            return None;
        }
        let total: Duration = self.samples.iter().flatten().sum();
        Some(total / received)
    }
}

/// Probe `host` with `cfg.rtt_count` timed connects to `cfg.rtt_port`.
pub async fn measure(cfg: &ProbeConfig, host: &str) -> Result<RttReport, ProbeError> {
    let addr = tokio::net::lookup_host((host, cfg.rtt_port))
        .await
        .map_err(|e| ProbeError::Resolve(e.to_string()))?
        .next()
        .ok_or_else(|| ProbeError::Resolve(format!("no addresses for {host}")))?;

    let mut samples = Vec::with_capacity(cfg.rtt_count as usize);
    for attempt in 0..cfg.rtt_count {
        if attempt > 0 {
            tokio::time::sleep(cfg.rtt_interval()).await;
        }
        let started = Instant::now();
        let sample = match tokio::time::timeout(cfg.rtt_timeout(), TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Some(started.elapsed()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                // The RST came back; that is a round trip.
                Some(started.elapsed())
            }
            Ok(Err(e)) => {
                debug!(addr = %addr, error = %e, "rtt attempt failed");
                None
            }
            Err(_) => None,
        };
        samples.push(sample);
    }

    Ok(RttReport {
        host: host.to_owned(),
        addr,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(samples: Vec<Option<Duration>>) -> RttReport {
        RttReport {
            host: "example.net".into(),
            addr: "192.0.2.1:80".parse().unwrap(),
            samples,
        }
    }

    #[test]
    fn test_stats_over_mixed_samples() {
        let r = report(vec![
            Some(Duration::from_millis(10)),
            None,
            Some(Duration::from_millis(30)),
            Some(Duration::from_millis(20)),
        ]);
        assert_eq!(r.sent(), 4);
        assert_eq!(r.received(), 3);
        assert_eq!(r.loss_percent(), 25.0);
        assert_eq!(r.min(), Some(Duration::from_millis(10)));
        assert_eq!(r.max(), Some(Duration::from_millis(30)));
        assert_eq!(r.avg(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_stats_all_lost() {
        let r = report(vec![None, None]);
        assert_eq!(r.received(), 0);
        assert_eq!(r.loss_percent(), 100.0);
        assert_eq!(r.min(), None);
        assert_eq!(r.avg(), None);
    }

    #[test]
    fn test_empty_report() {
        let r = report(Vec::new());
        assert_eq!(r.loss_percent(), 0.0);
    }
}
