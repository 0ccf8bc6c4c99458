//! Engine configuration and per-call connection parameters.
//!
//! The TOML-loadable [`OpsConfig`] carries policy knobs (rate thresholds,
//! probe timeouts, services routing); [`ConnectParams`] is supplied per
//! `connect` call and never stored, so credentials do not persist inside
//! the engine.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpsConfig {
    /// Burst/flood detection policy.
    #[serde(default)]
    pub rate: RatePolicy,
    /// Probe toolkit timeouts and widths.
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Network services (NickServ) integration.
    #[serde(default)]
    pub services: ServicesConfig,
}

impl OpsConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: OpsConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Sliding-window detection policy shared by join-burst and message-flood
/// tracking. Defaults to 12 events in a trailing 10 seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatePolicy {
    /// Events within the window that trip an alert.
    #[serde(default = "default_rate_threshold")]
    pub threshold: u32,
    /// Trailing window length in seconds.
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl RatePolicy {
    /// Window length as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            threshold: default_rate_threshold(),
            window_secs: default_rate_window_secs(),
        }
    }
}

/// How unsolicited NOTICE traffic is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticePolicy {
    /// Server notices are decorative noise; drop them after raw-logging.
    Drop,
    /// Private notices from the services nick are recorded as chat under
    /// the synthetic `@services` pseudo-target.
    ServicesToChat,
}

/// Network-services integration (nickname ownership service).
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Nickname the services bot is addressed as.
    #[serde(default = "default_services_nick")]
    pub nick: String,
    /// Delay before the post-registration IDENTIFY fires, letting
    /// registration fully settle.
    #[serde(default = "default_identify_delay_secs")]
    pub identify_delay_secs: u64,
    /// NOTICE routing policy.
    #[serde(default = "default_notice_policy")]
    pub notice_policy: NoticePolicy,
}

impl ServicesConfig {
    /// Identify delay as a [`Duration`].
    pub fn identify_delay(&self) -> Duration {
        Duration::from_secs(self.identify_delay_secs)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            nick: default_services_nick(),
            identify_delay_secs: default_identify_delay_secs(),
            notice_policy: default_notice_policy(),
        }
    }
}

/// Probe toolkit knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Per-port connect timeout for scans, milliseconds.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    /// Concurrent scan worker width.
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
    /// Well-known port the RTT probe connects to.
    #[serde(default = "default_rtt_port")]
    pub rtt_port: u16,
    /// Number of sequential RTT attempts.
    #[serde(default = "default_rtt_count")]
    pub rtt_count: u32,
    /// Spacing between RTT attempts, milliseconds.
    #[serde(default = "default_rtt_interval_ms")]
    pub rtt_interval_ms: u64,
    /// Per-attempt RTT connect timeout, milliseconds.
    #[serde(default = "default_rtt_timeout_ms")]
    pub rtt_timeout_ms: u64,
    /// Overall deadline for a line-protocol query, milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Whether address lookups are augmented with GeoIP metadata.
    #[serde(default = "default_true")]
    pub geoip: bool,
}

impl ProbeConfig {
    /// Per-port scan timeout.
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// RTT inter-probe spacing.
    pub fn rtt_interval(&self) -> Duration {
        Duration::from_millis(self.rtt_interval_ms)
    }

    /// RTT per-attempt timeout.
    pub fn rtt_timeout(&self) -> Duration {
        Duration::from_millis(self.rtt_timeout_ms)
    }

    /// Line-query overall deadline.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: default_scan_timeout_ms(),
            scan_workers: default_scan_workers(),
            rtt_port: default_rtt_port(),
            rtt_count: default_rtt_count(),
            rtt_interval_ms: default_rtt_interval_ms(),
            rtt_timeout_ms: default_rtt_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            geoip: default_true(),
        }
    }
}

/// How a connection authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Send `PASS <account>;<password>` before NICK (gateway variant).
    #[default]
    PassPreRegistration,
    /// Defer to a post-registration `IDENTIFY` to the services nick.
    Services,
}

/// Account credentials, supplied per call.
#[derive(Clone)]
pub struct Credentials {
    /// Account identifier (email on gateway networks).
    pub account: String,
    /// Secret; never logged.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parameters for one `connect` call.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Nickname to register.
    pub nick: String,
    /// Realname for the USER declaration.
    pub realname: String,
    /// Optional credentials.
    pub credentials: Option<Credentials>,
    /// Authentication handshake variant.
    pub auth: AuthMethod,
}

impl ConnectParams {
    /// Plain unauthenticated parameters.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        nick: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            nick: nick.into(),
            realname: realname.into(),
            credentials: None,
            auth: AuthMethod::default(),
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_rate_threshold() -> u32 {
    12
}

fn default_rate_window_secs() -> u64 {
    10
}

fn default_services_nick() -> String {
    "NickServ".to_string()
}

fn default_identify_delay_secs() -> u64 {
    2
}

fn default_notice_policy() -> NoticePolicy {
    NoticePolicy::Drop
}

fn default_scan_timeout_ms() -> u64 {
    2000
}

fn default_scan_workers() -> usize {
    20
}

fn default_rtt_port() -> u16 {
    80
}

fn default_rtt_count() -> u32 {
    4
}

fn default_rtt_interval_ms() -> u64 {
    1000
}

fn default_rtt_timeout_ms() -> u64 {
    2000
}

fn default_query_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let cfg = OpsConfig::default();
        assert_eq!(cfg.rate.threshold, 12);
        assert_eq!(cfg.rate.window(), Duration::from_secs(10));
        assert_eq!(cfg.probe.scan_workers, 20);
        assert_eq!(cfg.services.nick, "NickServ");
        assert_eq!(cfg.services.notice_policy, NoticePolicy::Drop);
    }

    #[test]
    fn test_parse_toml_overrides() {
        let cfg: OpsConfig = toml::from_str(
            r#"
            [rate]
            threshold = 5
            window_secs = 30

            [services]
            nick = "Keeper"
            notice_policy = "services-to-chat"

            [probe]
            scan_workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.rate.threshold, 5);
        assert_eq!(cfg.rate.window_secs, 30);
        assert_eq!(cfg.services.nick, "Keeper");
        assert_eq!(cfg.services.notice_policy, NoticePolicy::ServicesToChat);
        assert_eq!(cfg.probe.scan_workers, 4);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.probe.rtt_port, 80);
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let c = Credentials {
            account: "sky@example.com".into(),
            password: "hunter2".into(),
        };
        let s = format!("{c:?}");
        assert!(!s.contains("hunter2"));
    }
}
