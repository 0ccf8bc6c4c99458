//! Network probe toolkit: DNS lookup, port scanning, RTT, line queries.
//!
//! [`ProbeToolkit`] holds the shared resolver and HTTP client and exposes
//! each probe both as a plain async method and as a `spawn_*` variant that
//! runs detached and delivers its result as a [`ProbeReport`] on a channel,
//! matching how the rest of the engine reports through events.

pub mod lookup;
pub mod query;
pub mod rtt;
pub mod scan;

use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

pub use self::lookup::{GeoInfo, LookupReport, ResolvedAddr, NO_REVERSE};
pub use self::rtt::RttReport;
pub use self::scan::{parse_port_spec, service_name, PortReport, PortState, COMMON_PORTS};

/// Sender half for streamed probe results.
pub type ProbeSender = mpsc::UnboundedSender<ProbeReport>;
/// Receiver half for streamed probe results.
pub type ProbeReceiver = mpsc::UnboundedReceiver<ProbeReport>;

/// Create a probe report channel.
pub fn channel() -> (ProbeSender, ProbeReceiver) {
    mpsc::unbounded_channel()
}

/// Result of a detached probe run.
#[derive(Debug)]
pub enum ProbeReport {
    /// Completed DNS/GeoIP lookup.
    Lookup(Result<LookupReport, ProbeError>),
    /// One scanned port, streamed as it lands (unordered).
    ScanPort(PortReport),
    /// Scan finished; all rows were streamed.
    ScanComplete {
        /// Scanned host.
        host: String,
        /// Number of open ports found.
        open: usize,
        /// Number of ports probed.
        scanned: usize,
    },
    /// Completed RTT run.
    Rtt(Result<RttReport, ProbeError>),
    /// Completed line query with the raw reply text.
    Query(Result<String, ProbeError>),
}

/// Shared probe machinery: config, DNS resolver, HTTP client.
#[derive(Clone)]
pub struct ProbeToolkit {
    cfg: ProbeConfig,
    resolver: TokioResolver,
    http: reqwest::Client,
}

impl ProbeToolkit {
    /// Build a toolkit from config. Uses the system resolver config when
    /// readable, public defaults otherwise.
    pub fn new(cfg: ProbeConfig) -> Self {
        let resolver = TokioResolver::builder_tokio()
            .map(|b| b.build())
            .unwrap_or_else(|_| {
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            });
        let http = reqwest::Client::builder()
            .timeout(cfg.query_timeout())
            .user_agent(concat!("slirc-ops/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            cfg,
            resolver,
            http,
        }
    }

    /// The config this toolkit was built with.
    pub fn config(&self) -> &ProbeConfig {
        &self.cfg
    }

    /// Forward + reverse DNS for `target`, with GeoIP enrichment of the
    /// first address when enabled.
    pub async fn lookup(&self, target: &str) -> Result<LookupReport, ProbeError> {
        let addrs = lookup::resolve(&self.resolver, target).await?;
        // GeoIP is enrichment; its failures degrade to a missing record
        // rather than failing the whole lookup.
        let geo = match (self.cfg.geoip, addrs.first()) {
            (true, Some(first)) => match lookup::geo_lookup(&self.http, first.ip).await {
                Ok(geo) => Some(geo),
                Err(e) => {
                    warn!(ip = %first.ip, code = e.error_code(), error = %e, "geoip lookup failed");
                    None
                }
            },
            _ => None,
        };
        Ok(LookupReport {
            target: target.to_owned(),
            addrs,
            geo,
        })
    }

    /// Scan `host` per the port spec, optionally streaming per-port rows.
    pub async fn scan(
        &self,
        host: &str,
        spec: &str,
        progress: Option<ProbeSender>,
    ) -> Result<Vec<PortReport>, ProbeError> {
        let ports = parse_port_spec(spec)?;
        Ok(scan::scan_ports(host, &ports, &self.cfg, progress).await)
    }

    /// Timed TCP connects against `host`.
    pub async fn rtt(&self, host: &str) -> Result<RttReport, ProbeError> {
        rtt::measure(&self.cfg, host).await
    }

    /// One-shot line query against `host:port`.
    pub async fn query(&self, host: &str, port: u16, payload: &str) -> Result<String, ProbeError> {
        query::query(&self.cfg, host, port, payload).await
    }

    /// Run a lookup detached, reporting on `tx`.
    pub fn spawn_lookup(&self, target: String, tx: ProbeSender) {
        let toolkit = self.clone();
        tokio::spawn(async move {
            let result = toolkit.lookup(&target).await;
            let _ = tx.send(ProbeReport::Lookup(result));
        });
    }

    /// Run a scan detached: rows stream as [`ProbeReport::ScanPort`] and a
    /// final [`ProbeReport::ScanComplete`] summarizes. The port spec is
    /// validated before spawning, so a bad spec fails fast here.
    pub fn spawn_scan(
        &self,
        host: String,
        spec: &str,
        tx: ProbeSender,
    ) -> Result<(), ProbeError> {
        let ports = parse_port_spec(spec)?;
        let toolkit = self.clone();
        tokio::spawn(async move {
            let results = scan::scan_ports(&host, &ports, &toolkit.cfg, Some(tx.clone())).await;
            let open = results
                .iter()
                .filter(|r| r.state == PortState::Open)
                .count();
            let _ = tx.send(ProbeReport::ScanComplete {
                host,
                open,
                scanned: results.len(),
            });
        });
        Ok(())
    }

    /// Run an RTT probe detached, reporting on `tx`.
    pub fn spawn_rtt(&self, host: String, tx: ProbeSender) {
        let toolkit = self.clone();
        tokio::spawn(async move {
            let result = toolkit.rtt(&host).await;
            let _ = tx.send(ProbeReport::Rtt(result));
        });
    }

    /// Run a line query detached, reporting on `tx`.
    pub fn spawn_query(&self, host: String, port: u16, payload: String, tx: ProbeSender) {
        let toolkit = self.clone();
        tokio::spawn(async move {
            let result = toolkit.query(&host, port, &payload).await;
            let _ = tx.send(ProbeReport::Query(result));
        });
    }
}
