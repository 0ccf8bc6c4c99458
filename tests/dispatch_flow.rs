//! End-to-end state tracking: lines pushed by a fake server surface as
//! typed events on the channel.

mod common;

use std::time::Duration;

use common::{FakeIrcPeer, FakeIrcServer};
use slirc_ops::config::{AuthMethod, ConnectParams, RatePolicy, ServicesConfig};
use slirc_ops::event::EventReceiver;
use slirc_ops::{event, Connection, EventKind};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(server: &FakeIrcServer) -> (Connection, EventReceiver, FakeIrcPeer) {
    let (tx, rx) = event::channel();
    let conn = Connection::connect(
        &ConnectParams {
            host: server.host(),
            port: server.port(),
            nick: "Sky".into(),
            realname: "Operator".into(),
            credentials: None,
            auth: AuthMethod::PassPreRegistration,
        },
        "admin",
        RatePolicy {
            threshold: 3,
            window_secs: 10,
        },
        ServicesConfig::default(),
        tx,
    )
    .await
    .expect("connect failed");

    let mut peer = server.accept().await;
    peer.expect_line().await; // NICK
    peer.expect_line().await; // USER
    (conn, rx, peer)
}

async fn next_matching<T>(
    rx: &mut EventReceiver,
    mut pick: impl FnMut(&EventKind) -> Option<T>,
) -> T {
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
            .await
            .expect("no event within timeout")
            .expect("event channel closed");
        if let Some(value) = pick(&event.kind) {
            return value;
        }
    }
}

#[tokio::test]
async fn test_self_join_triggers_names_and_roster_merges() {
    let server = FakeIrcServer::spawn().await;
    let (_conn, mut rx, mut peer) = connect(&server).await;

    peer.send_line(":Sky!op@console.example JOIN #ops").await;
    assert_eq!(peer.expect_line().await, "NAMES #ops");

    peer.send_line(":irc.test 353 Sky = #ops :@alice +bob Sky").await;

    let members = next_matching(&mut rx, |kind| match kind {
        EventKind::Roster { channel, members } if channel == "#ops" && members.len() == 3 => {
            Some(members.clone())
        }
        _ => None,
    })
    .await;

    let nicks: Vec<&str> = members.iter().map(|m| m.nick.as_str()).collect();
    assert_eq!(nicks, vec!["alice", "bob", "Sky"]);
    assert_eq!(members[0].prefix, "@");
    assert_eq!(members[1].prefix, "+");
    assert_eq!(members[2].prefix, "");
}

#[tokio::test]
async fn test_channel_message_surfaces_as_chat() {
    let server = FakeIrcServer::spawn().await;
    let (_conn, mut rx, mut peer) = connect(&server).await;

    peer.send_line(":alice!a@h PRIVMSG #ops :\x0304deploy\x03 is live")
        .await;

    let chat = next_matching(&mut rx, |kind| match kind {
        EventKind::Chat(records) if !records.is_empty() => Some(records.clone()),
        _ => None,
    })
    .await;

    assert_eq!(chat[0].target, "#ops");
    assert_eq!(chat[0].nick, "alice");
    assert_eq!(chat[0].text, "deploy is live");
}

#[tokio::test]
async fn test_flood_alert_over_the_wire() {
    let server = FakeIrcServer::spawn().await;
    let (_conn, mut rx, mut peer) = connect(&server).await;

    for _ in 0..3 {
        peer.send_line(":spammer!s@h PRIVMSG #ops :buy now").await;
    }

    let alert = next_matching(&mut rx, |kind| match kind {
        EventKind::Alert(text) => Some(text.clone()),
        _ => None,
    })
    .await;
    assert_eq!(alert, "Flood: spammer in #ops: 3/10s");
}

#[tokio::test]
async fn test_whois_aggregation_over_the_wire() {
    let server = FakeIrcServer::spawn().await;
    let (conn, mut rx, mut peer) = connect(&server).await;

    conn.whois("alice").await;
    assert_eq!(peer.expect_line().await, "WHOIS alice");

    peer.send_line(":irc.test 311 Sky alice ally example.net * :Alice A.")
        .await;
    peer.send_line(":irc.test 319 Sky alice :@#ops +#dev").await;
    peer.send_line(":irc.test 318 Sky alice :End of /WHOIS list.")
        .await;

    let (nick, lines) = next_matching(&mut rx, |kind| match kind {
        EventKind::WhoisResult { nick, lines } => Some((nick.clone(), lines.clone())),
        _ => None,
    })
    .await;

    assert_eq!(nick, "alice");
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("311:"));
    assert!(lines[1].starts_with("319:"));
}

#[tokio::test]
async fn test_list_flow_resets_then_accumulates() {
    let server = FakeIrcServer::spawn().await;
    let (conn, mut rx, mut peer) = connect(&server).await;

    // Seed a stale row from an earlier LIST.
    peer.send_line(":irc.test 322 Sky #stale 1 :old").await;
    next_matching(&mut rx, |kind| match kind {
        EventKind::ChannelList(rows) if rows.len() == 1 => Some(()),
        _ => None,
    })
    .await;

    conn.list().await;
    assert_eq!(peer.expect_line().await, "LIST");

    peer.send_line(":irc.test 322 Sky #ops 7 :operations").await;

    let rows = next_matching(&mut rx, |kind| match kind {
        EventKind::ChannelList(rows) if rows.iter().any(|r| r.name == "#ops") => {
            Some(rows.clone())
        }
        _ => None,
    })
    .await;

    // The stale row must be gone after the reset.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "#ops");
    assert_eq!(rows[0].users, 7);
}

#[tokio::test]
async fn test_hostmask_event_from_message_prefix() {
    let server = FakeIrcServer::spawn().await;
    let (_conn, mut rx, mut peer) = connect(&server).await;

    peer.send_line(":alice!ally@net.example JOIN #ops").await;

    let (nick, mask) = next_matching(&mut rx, |kind| match kind {
        EventKind::Hostmask { nick, mask } => Some((nick.clone(), mask.clone())),
        _ => None,
    })
    .await;
    assert_eq!(nick, "alice");
    assert_eq!(mask, "ally@net.example");
}
