//! slirc-ops - Straylight IRC Operator Console Engine
//!
//! The headless core of an operator console: everything a front-end needs
//! except the pixels. One [`Connection`] per IRC session dials, registers,
//! tracks channel/member/hostmask state, aggregates WHOIS, watches join and
//! message rates, and reports every observation as a typed [`Event`] on an
//! unbounded channel keyed by connection label. The [`probe`] module adds
//! the network toolkit: DNS/GeoIP lookup, TCP port scanning with banner
//! grabs, RTT measurement, and one-shot line-protocol queries.
//!
//! Wire-level parsing and framing live in the `slirc-wire` crate.

pub mod config;
pub mod conn;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod probe;
pub mod rate;
pub mod state;

pub use slirc_wire;

pub use crate::config::{AuthMethod, ConnectParams, Credentials, OpsConfig, RatePolicy, ServicesConfig};
pub use crate::conn::Connection;
pub use crate::dispatch::{Action, Session};
pub use crate::error::ProbeError;
pub use crate::event::{Event, EventKind, EventReceiver, EventSender};
pub use crate::probe::ProbeToolkit;
