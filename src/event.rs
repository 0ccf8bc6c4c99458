//! The event emission channel and its typed taxonomy.
//!
//! Everything the presentation layer learns crosses exactly one ordered,
//! unbounded, multi-producer/single-consumer channel. Collections are
//! delivered as full snapshots: the consumer treats each as the new
//! authoritative view, never as a diff.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Sender half of the emission channel; clone freely.
pub type EventSender = mpsc::UnboundedSender<Event>;
/// Consumer half; drained on the presentation layer's polling cadence.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the emission channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// One emitted event, tagged with the originating connection's label
/// (e.g. `"admin"` or `"bot"`).
#[derive(Debug, Clone)]
pub struct Event {
    /// Identity label of the connection that produced this event.
    pub label: String,
    /// Typed payload.
    pub kind: EventKind,
}

/// Closed set of event variants.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// Human-readable connection status text.
    Status(String),
    /// Channel-list snapshot (replaced wholesale per LIST).
    ChannelList(Vec<ChannelEntry>),
    /// Per-channel roster snapshot, sorted case-insensitively.
    Roster {
        /// Channel the roster belongs to.
        channel: String,
        /// Members with their privilege prefixes.
        members: Vec<RosterEntry>,
    },
    /// Chat-log snapshot (bounded, oldest evicted first).
    Chat(Vec<ChatRecord>),
    /// Raw protocol-line log snapshot.
    RawLog(Vec<String>),
    /// Abuse alert text (join burst / message flood).
    Alert(String),
    /// A nickname's hostmask was observed or updated.
    Hostmask {
        /// Nickname.
        nick: String,
        /// `user@host` as reported by the origin.
        mask: String,
    },
    /// Assembled WHOIS reply delivered on the terminating numeric.
    WhoisResult {
        /// Target nickname.
        nick: String,
        /// Reply fragments in arrival order.
        lines: Vec<String>,
    },
}

/// One LIST row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Channel name.
    pub name: String,
    /// Reported user count.
    pub users: u32,
    /// Topic, display-stripped.
    pub topic: String,
}

/// One roster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Bare nickname.
    pub nick: String,
    /// Leading privilege prefix characters (`~&@%+`), possibly empty.
    pub prefix: String,
}

/// One chat line (channel message, direct message, or routed service
/// notice under a synthetic pseudo-target).
#[derive(Debug, Clone)]
pub struct ChatRecord {
    /// Arrival time.
    pub at: DateTime<Utc>,
    /// Channel name, or `@nick` / `@services` pseudo-target.
    pub target: String,
    /// Originating nickname.
    pub nick: String,
    /// Message text, display-stripped.
    pub text: String,
}
