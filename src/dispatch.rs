//! Line handling for one connection.
//!
//! [`Session`] owns the derived state and rate windows for a single
//! connection and turns each framed line into state mutations, emitted
//! events, and follow-up actions. It never touches a socket: outbound
//! replies (PONG, NAMES) come back as [`Action`]s for the connection task
//! to write, which keeps the whole dispatch table testable without any
//! network.

use std::time::Instant;

use tracing::trace;

use slirc_wire::colors::FormattedStringExt;
use slirc_wire::{numeric, Message};

use crate::config::{NoticePolicy, RatePolicy, ServicesConfig};
use crate::event::{ChannelEntry, Event, EventKind, EventSender};
use crate::rate::RateTracker;
use crate::state::SessionState;

/// Synthetic chat target for routed service notices.
pub const SERVICES_TARGET: &str = "@services";

/// Follow-up decided by line handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write this line to the server.
    Send(String),
    /// Registration completed (001); the connection may schedule its
    /// deferred identify.
    Registered,
}

/// Per-connection dispatch state.
pub struct Session {
    label: String,
    nick: String,
    services: ServicesConfig,
    state: SessionState,
    rates: RateTracker,
    events: EventSender,
}

impl Session {
    /// Create a session for a connection registering as `nick`.
    pub fn new(
        label: impl Into<String>,
        nick: impl Into<String>,
        policy: RatePolicy,
        services: ServicesConfig,
        events: EventSender,
    ) -> Self {
        Self {
            label: label.into(),
            nick: nick.into(),
            services,
            state: SessionState::new(),
            rates: RateTracker::new(policy),
            events,
        }
    }

    /// This connection's own nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Read access to the derived state (for the owning task only).
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn emit(&self, kind: EventKind) {
        // The consumer dropping its receiver is an orderly shutdown, not
        // an error worth surfacing per-event.
        let _ = self.events.send(Event {
            label: self.label.clone(),
            kind,
        });
    }

    fn status(&self, text: impl Into<String>) {
        self.emit(EventKind::Status(text.into()));
    }

    fn alert(&self, text: String) {
        self.emit(EventKind::Alert(text));
    }

    fn emit_roster(&self, channel: &str) {
        self.emit(EventKind::Roster {
            channel: channel.to_owned(),
            members: self.state.roster(channel),
        });
    }

    fn log_chat(&mut self, target: &str, nick: &str, text: &str) {
        let clean = text.strip_formatting().into_owned();
        self.state.push_chat(target, nick, clean);
        self.emit(EventKind::Chat(self.state.chat_snapshot()));
    }

    /// Reset the channel list ahead of an outgoing LIST and publish the
    /// empty snapshot.
    pub fn prepare_list(&mut self) {
        self.state.clear_channels();
        self.emit(EventKind::ChannelList(self.state.channels_snapshot()));
    }

    /// Handle one framed protocol line observed at `now`.
    pub fn handle_line(&mut self, raw: &str, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();

        let Ok(msg) = raw.parse::<Message>() else {
            return actions;
        };

        // Keepalive is answered before any other processing of the line.
        if msg.command == "PING" {
            actions.push(Action::Send(format!("PONG :{}", msg.trailing())));
        }

        self.state
            .push_raw(raw.strip_formatting().into_owned());
        self.emit(EventKind::RawLog(self.state.raw_snapshot()));

        if msg.command == "PING" {
            return actions;
        }

        // Any origin carrying a resolvable user/host updates the hostmask
        // map, whatever the command.
        if let Some(prefix) = &msg.prefix {
            if let (Some(nick), Some(mask)) = (prefix.nick(), prefix.hostmask()) {
                self.state.set_hostmask(nick, &mask);
                self.emit(EventKind::Hostmask {
                    nick: nick.to_owned(),
                    mask,
                });
            }
        }

        if let Some(code) = msg.numeric() {
            self.handle_numeric(code, &msg, &mut actions);
            return actions;
        }

        let source = msg.source_nick().map(str::to_owned);
        match msg.command.as_str() {
            "JOIN" => self.on_join(&msg, source.as_deref(), now, &mut actions),
            "PART" => self.on_part(&msg, source.as_deref()),
            "QUIT" => self.on_quit(source.as_deref()),
            "KICK" => self.on_kick(&msg),
            "PRIVMSG" => self.on_privmsg(&msg, source.as_deref(), now),
            "NOTICE" => self.on_notice(&msg, source.as_deref()),
            other => trace!(label = %self.label, command = %other, "ignoring command"),
        }
        actions
    }

    fn handle_numeric(&mut self, code: u16, msg: &Message, actions: &mut Vec<Action>) {
        match code {
            numeric::RPL_WELCOME => {
                self.status("Registered (001).");
                actions.push(Action::Registered);
            }
            numeric::RPL_LIST if msg.params.len() >= 3 => {
                let users = msg.param(2).parse().unwrap_or(0);
                self.state.push_channel(ChannelEntry {
                    name: msg.param(1).to_owned(),
                    users,
                    topic: msg.param(3).strip_formatting().into_owned(),
                });
                self.emit(EventKind::ChannelList(self.state.channels_snapshot()));
            }
            numeric::RPL_NAMREPLY if msg.params.len() >= 4 => {
                let channel = msg.param(2).to_owned();
                let names = msg.param(3).strip_formatting().into_owned();
                self.state.merge_names(&channel, &names);
                self.emit_roster(&channel);
            }
            code if numeric::is_whois_detail(code) => {
                let target = msg.param(1).to_owned();
                if !target.is_empty() {
                    let info = msg.params[1..].join(" ");
                    let info = info.strip_formatting();
                    self.state.whois_push(&target, format!("{code}: {info}"));
                }
            }
            numeric::RPL_ENDOFWHOIS => {
                let target = msg.param(1).to_owned();
                let lines = self.state.whois_flush(&target);
                self.emit(EventKind::WhoisResult {
                    nick: target,
                    lines,
                });
            }
            other => trace!(label = %self.label, numeric = other, "ignoring numeric"),
        }
    }

    fn on_join(
        &mut self,
        msg: &Message,
        source: Option<&str>,
        now: Instant,
        actions: &mut Vec<Action>,
    ) {
        let channel = msg.param(0).to_owned();
        if channel.is_empty() {
            return;
        }
        if let Some(count) = self.rates.note_join(&channel, now) {
            self.alert(format!(
                "Join burst in {channel}: {count}/{}s",
                self.rates.policy().window_secs
            ));
        }
        let Some(nick) = source else { return };
        self.state.add_member(&channel, nick);
        self.emit_roster(&channel);
        // A self-join triggers a roster refresh; other joins do not.
        if nick == self.nick {
            actions.push(Action::Send(format!("NAMES {channel}")));
        }
    }

    fn on_part(&mut self, msg: &Message, source: Option<&str>) {
        let channel = msg.param(0);
        if let Some(nick) = source {
            if !channel.is_empty() {
                self.state.remove_member(channel, nick);
                self.emit_roster(channel);
            }
        }
    }

    fn on_quit(&mut self, source: Option<&str>) {
        if let Some(nick) = source {
            for channel in self.state.remove_member_everywhere(nick) {
                self.emit_roster(&channel);
            }
        }
    }

    fn on_kick(&mut self, msg: &Message) {
        if msg.params.len() >= 2 {
            let channel = msg.param(0).to_owned();
            let kicked = msg.param(1).to_owned();
            self.state.remove_member(&channel, &kicked);
            self.emit_roster(&channel);
        }
    }

    fn on_privmsg(&mut self, msg: &Message, source: Option<&str>, now: Instant) {
        if msg.params.len() < 2 {
            return;
        }
        let target = msg.param(0).to_owned();
        let text = msg.param(1).to_owned();
        let nick = source.unwrap_or_default().to_owned();

        if target.starts_with('#') {
            self.log_chat(&target, &nick, &text);
            if let Some(count) = self.rates.note_message(&target, &nick, now) {
                self.alert(format!(
                    "Flood: {nick} in {target}: {count}/{}s",
                    self.rates.policy().window_secs
                ));
            }
        } else if target == self.nick && !nick.is_empty() {
            // Direct message: synthetic @nick pseudo-target.
            self.log_chat(&format!("@{nick}"), &nick, &text);
        }
    }

    fn on_notice(&mut self, msg: &Message, source: Option<&str>) {
        match self.services.notice_policy {
            // Server notices are decorative noise on the gateway variant.
            NoticePolicy::Drop => {}
            NoticePolicy::ServicesToChat => {
                let Some(nick) = source else { return };
                if msg.params.len() >= 2
                    && msg.param(0) == self.nick
                    && nick.eq_ignore_ascii_case(&self.services.nick)
                {
                    let text = msg.param(1).to_owned();
                    self.log_chat(SERVICES_TARGET, nick, &text);
                }
            }
        }
    }
}
