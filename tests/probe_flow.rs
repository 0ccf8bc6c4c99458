//! Integration tests for the probe toolkit against loopback listeners.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use slirc_ops::config::ProbeConfig;
use slirc_ops::probe::{self, PortState, ProbeReport, ProbeToolkit};

mod common;

fn fast_config() -> ProbeConfig {
    common::init_tracing();
    ProbeConfig {
        scan_timeout_ms: 1000,
        rtt_count: 3,
        rtt_interval_ms: 10,
        rtt_timeout_ms: 1000,
        query_timeout_ms: 1000,
        geoip: false,
        ..ProbeConfig::default()
    }
}

async fn ephemeral_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    (listener, port)
}

/// Greet every connection on `listener` with a banner line.
fn serve_banner(listener: TcpListener, banner: &'static str) {
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = stream.write_all(format!("{banner}\r\n").as_bytes()).await;
            });
        }
    });
}

/// Bind and drop a listener to obtain a port that actively refuses.
async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr").port()
}

#[tokio::test]
async fn test_scan_classifies_open_and_closed() {
    let (listener, open_port) = ephemeral_listener().await;
    serve_banner(listener, "220 ready");
    let closed_port = refused_port().await;

    let toolkit = ProbeToolkit::new(fast_config());
    let spec = format!("{open_port},{closed_port}");
    let results = toolkit
        .scan("127.0.0.1", &spec, None)
        .await
        .expect("scan failed");

    assert_eq!(results.len(), 2);
    // Rows come back sorted by port regardless of completion order.
    assert!(results[0].port < results[1].port);

    let open = results
        .iter()
        .find(|r| r.port == open_port)
        .expect("open row");
    assert_eq!(open.state, PortState::Open);
    assert_eq!(open.banner, "220 ready");

    let closed = results
        .iter()
        .find(|r| r.port == closed_port)
        .expect("closed row");
    assert_eq!(closed.state, PortState::Closed);
    assert!(closed.banner.is_empty());
}

#[tokio::test]
async fn test_spawn_scan_streams_rows_and_summary() {
    let (listener, open_port) = ephemeral_listener().await;
    serve_banner(listener, "hello");
    let closed_port = refused_port().await;

    let toolkit = ProbeToolkit::new(fast_config());
    let (tx, mut rx) = probe::channel();
    toolkit
        .spawn_scan("127.0.0.1".into(), &format!("{open_port},{closed_port}"), tx)
        .expect("spec rejected");

    let mut rows = 0;
    loop {
        let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("probe report timed out")
            .expect("channel closed");
        match report {
            ProbeReport::ScanPort(_) => rows += 1,
            ProbeReport::ScanComplete {
                host,
                open,
                scanned,
            } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(open, 1);
                assert_eq!(scanned, 2);
                break;
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_spawn_scan_rejects_bad_spec() {
    let toolkit = ProbeToolkit::new(fast_config());
    let (tx, _rx) = probe::channel();
    assert!(toolkit
        .spawn_scan("127.0.0.1".into(), "not-ports", tx)
        .is_err());
}

#[tokio::test]
async fn test_query_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("read");
        let reply = format!("echo: {}\r\n", line.trim_end());
        write.write_all(reply.as_bytes()).await.expect("write");
        // Dropping both halves closes the stream, ending the read loop.
    });

    let toolkit = ProbeToolkit::new(fast_config());
    let reply = toolkit
        .query("127.0.0.1", port, "VERSION")
        .await
        .expect("query failed");
    assert_eq!(reply.trim_end(), "echo: VERSION");
}

#[tokio::test]
async fn test_query_refused_port() {
    let port = refused_port().await;
    let toolkit = ProbeToolkit::new(fast_config());
    let err = toolkit
        .query("127.0.0.1", port, "VERSION")
        .await
        .expect_err("query should fail");
    assert!(matches!(err, slirc_ops::ProbeError::Refused));
}

#[tokio::test]
async fn test_rtt_against_loopback() {
    let (listener, port) = ephemeral_listener().await;
    // Keep accepting so every probe connect completes.
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });

    let cfg = ProbeConfig {
        rtt_port: port,
        ..fast_config()
    };
    let report = ProbeToolkit::new(cfg)
        .rtt("127.0.0.1")
        .await
        .expect("rtt failed");

    assert_eq!(report.sent(), 3);
    assert_eq!(report.received(), 3);
    assert_eq!(report.loss_percent(), 0.0);
    let (min, avg, max) = (
        report.min().expect("min"),
        report.avg().expect("avg"),
        report.max().expect("max"),
    );
    assert!(min <= avg && avg <= max);
}

#[tokio::test]
async fn test_rtt_counts_refusal_as_round_trip() {
    let port = refused_port().await;
    let cfg = ProbeConfig {
        rtt_port: port,
        ..fast_config()
    };
    let report = ProbeToolkit::new(cfg)
        .rtt("127.0.0.1")
        .await
        .expect("rtt failed");
    assert_eq!(report.received(), report.sent());
}

#[tokio::test]
async fn test_lookup_literal_ip_skips_forward_resolution() {
    let toolkit = ProbeToolkit::new(fast_config());
    let report = toolkit.lookup("127.0.0.1").await.expect("lookup failed");
    assert_eq!(report.addrs.len(), 1);
    assert_eq!(report.addrs[0].family, "IPv4");
    assert!(report.geo.is_none());
    assert!(!report.addrs[0].reverse.is_empty());
}
