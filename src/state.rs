//! Derived per-connection state.
//!
//! Owned exclusively by the connection's receive task (single-writer
//! discipline): the presentation layer only ever sees this state through
//! event-channel snapshots, never by reaching in. None of these structures
//! carry locks for that reason.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;

use crate::event::{ChannelEntry, ChatRecord, RosterEntry};

/// Raw protocol-line log capacity; oldest evicted first.
pub const RAW_LOG_CAP: usize = 5000;
/// Chat-record log capacity; oldest evicted first.
pub const CHAT_LOG_CAP: usize = 10_000;

/// Privilege prefix characters in descending rank: owner, admin, op,
/// halfop, voice.
pub const PRIVILEGE_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// All derived state for one connection.
#[derive(Debug, Default)]
pub struct SessionState {
    /// LIST rows; replaced wholesale on each LIST.
    channels: Vec<ChannelEntry>,
    /// Channel -> member nicknames.
    members: HashMap<String, HashSet<String>>,
    /// Channel -> nick -> privilege prefix characters.
    prefixes: HashMap<String, HashMap<String, String>>,
    /// Nick -> `user@host`; last-seen wins, never expires in-session.
    hostmasks: HashMap<String, String>,
    /// WHOIS accumulators, keyed by target nick. Non-empty only between a
    /// query and its terminator. Concurrent queries for the same target
    /// interleave fragments under one key; the first terminator flushes
    /// them all (documented ambiguity, kept as observed).
    whois: HashMap<String, Vec<String>>,
    raw_log: VecDeque<String>,
    chat_log: VecDeque<ChatRecord>,
}

impl SessionState {
    /// Fresh empty state.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Channel list ──────────────────────────────────────────────

    /// Drop all LIST rows (called right before a LIST request goes out).
    pub fn clear_channels(&mut self) {
        self.channels.clear();
    }

    /// Append one LIST row.
    pub fn push_channel(&mut self, entry: ChannelEntry) {
        self.channels.push(entry);
    }

    /// Snapshot of the channel list.
    pub fn channels_snapshot(&self) -> Vec<ChannelEntry> {
        self.channels.clone()
    }

    /// Channel names currently known from LIST.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    // ── Membership ────────────────────────────────────────────────

    /// Add `nick` to `channel`'s membership.
    pub fn add_member(&mut self, channel: &str, nick: &str) {
        self.members
            .entry(channel.to_owned())
            .or_default()
            .insert(nick.to_owned());
    }

    /// Remove `nick` from `channel`'s membership.
    pub fn remove_member(&mut self, channel: &str, nick: &str) {
        if let Some(set) = self.members.get_mut(channel) {
            set.remove(nick);
        }
        if let Some(map) = self.prefixes.get_mut(channel) {
            map.remove(nick);
        }
    }

    /// Remove `nick` from every channel it belonged to, returning the
    /// affected channel names.
    pub fn remove_member_everywhere(&mut self, nick: &str) -> Vec<String> {
        let mut affected = Vec::new();
        for (channel, set) in &mut self.members {
            if set.remove(nick) {
                affected.push(channel.clone());
            }
        }
        for channel in &affected {
            if let Some(map) = self.prefixes.get_mut(channel) {
                map.remove(nick);
            }
        }
        affected
    }

    /// Merge one NAMES row into `channel`'s membership: each token loses
    /// its leading privilege prefixes, which are recorded against the bare
    /// nick. Merges into the existing set; never wholesale-replaces it.
    pub fn merge_names(&mut self, channel: &str, names: &str) {
        let set = self.members.entry(channel.to_owned()).or_default();
        let prefixes = self.prefixes.entry(channel.to_owned()).or_default();
        for token in names.split_whitespace() {
            let bare = token.trim_start_matches(PRIVILEGE_PREFIXES);
            if bare.is_empty() {
                continue;
            }
            let prefix = &token[..token.len() - bare.len()];
            set.insert(bare.to_owned());
            if !prefix.is_empty() {
                prefixes.insert(bare.to_owned(), prefix.to_owned());
            }
        }
    }

    /// Whether `nick` is currently a member of `channel`.
    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.members
            .get(channel)
            .is_some_and(|set| set.contains(nick))
    }

    /// Roster snapshot for `channel`, sorted case-insensitively.
    pub fn roster(&self, channel: &str) -> Vec<RosterEntry> {
        let mut nicks: Vec<&String> = self
            .members
            .get(channel)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        nicks.sort_by_key(|n| n.to_lowercase());
        let prefixes = self.prefixes.get(channel);
        nicks
            .into_iter()
            .map(|nick| RosterEntry {
                nick: nick.clone(),
                prefix: prefixes
                    .and_then(|m| m.get(nick))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }

    // ── Hostmasks ─────────────────────────────────────────────────

    /// Record `nick`'s hostmask; last-seen wins.
    pub fn set_hostmask(&mut self, nick: &str, mask: &str) {
        self.hostmasks.insert(nick.to_owned(), mask.to_owned());
    }

    /// Look up a nick's last-seen hostmask.
    pub fn hostmask(&self, nick: &str) -> Option<&str> {
        self.hostmasks.get(nick).map(String::as_str)
    }

    // ── WHOIS accumulation ────────────────────────────────────────

    /// Append a reply fragment for `target`.
    pub fn whois_push(&mut self, target: &str, line: String) {
        self.whois.entry(target.to_owned()).or_default().push(line);
    }

    /// Pop and return `target`'s accumulated fragments (empty when none).
    pub fn whois_flush(&mut self, target: &str) -> Vec<String> {
        self.whois.remove(target).unwrap_or_default()
    }

    /// Whether an accumulation is in flight for `target`.
    pub fn whois_pending(&self, target: &str) -> bool {
        self.whois.contains_key(target)
    }

    // ── Bounded logs ──────────────────────────────────────────────

    /// Append a raw protocol line, evicting the oldest past capacity.
    pub fn push_raw(&mut self, line: String) {
        if self.raw_log.len() == RAW_LOG_CAP {
            self.raw_log.pop_front();
        }
        self.raw_log.push_back(line);
    }

    /// Snapshot of the raw-line log.
    pub fn raw_snapshot(&self) -> Vec<String> {
        self.raw_log.iter().cloned().collect()
    }

    /// Append a chat record, evicting the oldest past capacity.
    pub fn push_chat(&mut self, target: &str, nick: &str, text: String) {
        if self.chat_log.len() == CHAT_LOG_CAP {
            self.chat_log.pop_front();
        }
        self.chat_log.push_back(ChatRecord {
            at: Utc::now(),
            target: target.to_owned(),
            nick: nick.to_owned(),
            text,
        });
    }

    /// Snapshot of the chat log.
    pub fn chat_snapshot(&self) -> Vec<ChatRecord> {
        self.chat_log.iter().cloned().collect()
    }
}
