//! End-to-end tests over a real loopback socket.
//!
//! The uplink runs with the production [`TcpConnector`]; the test plays
//! the receiving endpoint with a `TcpListener`, the same `LineDecoder`,
//! and `decode_record` the reference receiver uses.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use crate::mock_link::{WAIT, fast_config, next_statuses, next_update};
use sensor_uplink::adapters::tcp::TcpConnector;
use sensor_uplink::archive::{CSV_HEADERS, CsvArchive};
use sensor_uplink::codec::{LineDecoder, decode_record};
use sensor_uplink::{Channel, ConnectionStatus, Endpoint, Uplink};

use ConnectionStatus::*;

fn make_uplink() -> Uplink<TcpConnector> {
    let config = fast_config();
    Uplink::new(TcpConnector::new(config.write_timeout()), config).unwrap()
}

fn listen() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, Endpoint::new("127.0.0.1", port).unwrap())
}

/// Read records from `stream` until `done` accepts one or time runs out.
fn read_until(stream: &mut TcpStream, mut done: impl FnMut(&[u8]) -> bool) -> Option<Vec<u8>> {
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let deadline = Instant::now() + WAIT;
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; 512];
    let mut found = None;

    while found.is_none() && Instant::now() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => decoder.feed(&buf[..n], |line| {
                if found.is_none() && done(line) {
                    found = Some(line.to_vec());
                }
            }),
            Err(_) => {}
        }
    }
    found
}

#[test]
fn records_round_trip_through_loopback() {
    let (listener, endpoint) = listen();
    let uplink = make_uplink();
    let rx = uplink.subscribe();

    uplink.connect(endpoint.clone()).unwrap();
    assert_eq!(next_statuses(&rx, 2), vec![Connecting, Connected]);
    let (mut server, _) = listener.accept().unwrap();

    uplink.report_sample(Channel::Accelerometer, &[1.0, 2.0, 3.0]);
    uplink.report_sample(Channel::Light, &[99.0]);

    let line = read_until(&mut server, |line| {
        decode_record(line).is_ok_and(|snap| snap.len() == 2)
    })
    .expect("record with both channels");

    let snapshot = decode_record(&line).unwrap();
    assert_eq!(
        snapshot.get(Channel::Accelerometer).map(|s| s.values().to_vec()),
        Some(vec![1.0, 2.0, 3.0])
    );
    assert_eq!(
        snapshot.get(Channel::Light).map(|s| s.values().to_vec()),
        Some(vec![99.0])
    );

    // Light travels as a bare number, not a one-element array.
    let raw: serde_json::Value = serde_json::from_slice(&line).unwrap();
    assert!(raw["Light"].is_number());
    assert!(raw["Accelerometer"].is_array());
    assert!(raw.get("Location").is_none());
}

#[test]
fn refused_port_fails_with_reason() {
    let (listener, endpoint) = listen();
    drop(listener);
    let uplink = make_uplink();
    let rx = uplink.subscribe();

    uplink.connect(endpoint).unwrap();
    assert_eq!(next_update(&rx).status, Connecting);
    let failed = next_update(&rx);
    assert_eq!(failed.status, Failed);
    assert!(failed.message.starts_with("connection failed:"), "{}", failed.message);
}

#[test]
fn peer_close_mid_stream_fails_once() {
    let (listener, endpoint) = listen();
    let uplink = make_uplink();
    let rx = uplink.subscribe();

    uplink.connect(endpoint).unwrap();
    assert_eq!(next_statuses(&rx, 2), vec![Connecting, Connected]);
    let (server, _) = listener.accept().unwrap();
    drop(server);
    drop(listener);

    uplink.report_sample(Channel::Light, &[5.0]);
    let failed = next_update(&rx);
    assert_eq!(failed.status, Failed);
    assert!(failed.message.starts_with("send failed:"), "{}", failed.message);
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_none());
}

#[test]
fn disconnect_closes_socket_for_receiver() {
    let (listener, endpoint) = listen();
    let uplink = make_uplink();
    let rx = uplink.subscribe();

    uplink.connect(endpoint).unwrap();
    next_statuses(&rx, 2);
    let (mut server, _) = listener.accept().unwrap();

    uplink.disconnect();
    assert_eq!(next_update(&rx).status, Disconnected);

    server.set_read_timeout(Some(WAIT)).unwrap();
    let mut rest = Vec::new();
    server.read_to_end(&mut rest).unwrap();
}

#[test]
fn received_records_append_to_peer_csv() {
    let (listener, endpoint) = listen();
    let uplink = make_uplink();
    let rx = uplink.subscribe();
    let dir = tempfile::tempdir().unwrap();
    let archive = CsvArchive::new(dir.path()).unwrap();

    uplink.connect(endpoint).unwrap();
    next_statuses(&rx, 2);
    let (mut server, peer) = listener.accept().unwrap();
    let mut file = archive.open(peer.ip()).unwrap();

    uplink.report_sample(Channel::Orientation, &[90.0, -1.5, 0.25]);
    let line = read_until(&mut server, |line| decode_record(line).is_ok()).expect("record");
    file.append_at("2024-05-01 12:00:00.000", &decode_record(&line).unwrap())
        .unwrap();

    let written = std::fs::read_to_string(archive.path_for(peer.ip())).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], CSV_HEADERS.join(","));
    assert_eq!(lines[1], "2024-05-01 12:00:00.000,,,,,,90,-1.5,0.25,");
}
