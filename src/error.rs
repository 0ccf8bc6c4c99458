//! Error types for the console engine.
//!
//! Connection-side failures never surface as `Err` values to the
//! presentation layer: they are reported as status events on the emission
//! channel so failures cross threads as data. The probe toolkit is the one
//! surface where callers match on typed error variants.

use thiserror::Error;

/// Failures from the network-probe toolkit.
///
/// Per-port scan failures are folded into their result records; these
/// variants cover whole-operation outcomes.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Forward resolution of the target failed; reported once for the
    /// whole operation, not per-address.
    #[error("resolution failed: {0}")]
    Resolve(String),

    /// The peer actively refused the connection.
    #[error("connection refused")]
    Refused,

    /// The operation's deadline elapsed.
    #[error("timed out")]
    Timeout,

    /// An unparsable port specification.
    #[error("invalid port spec: {0}")]
    BadPortSpec(String),

    /// The geolocation service answered with a failure status.
    #[error("geolocation unavailable: {0}")]
    Geo(String),

    /// Any other socket-level fault.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure talking to the geolocation service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProbeError {
    /// Static label for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "resolve",
            Self::Refused => "refused",
            Self::Timeout => "timeout",
            Self::BadPortSpec(_) => "bad_port_spec",
            Self::Geo(_) => "geo",
            Self::Io(_) => "io",
            Self::Http(_) => "http",
        }
    }
}
