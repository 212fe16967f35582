//! Integration tests for the Uplink → FSM → Dispatcher → Link pipeline.
//!
//! These drive the control surface exactly as a UI would and assert on
//! the published status sequence and on the recorded link calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::mock_link::{
    MockConnector, assert_quiet, fast_config, next_statuses, next_update,
};
use sensor_uplink::app::events::StatusUpdate;
use sensor_uplink::app::ports::StatusObserver;
use sensor_uplink::{Channel, ConnectionStatus, Endpoint, Uplink, UplinkCommand};

use ConnectionStatus::*;

fn make_uplink() -> (Uplink<MockConnector>, MockConnector) {
    let connector = MockConnector::new();
    let uplink = Uplink::new(connector.clone(), fast_config()).unwrap();
    (uplink, connector)
}

fn ep(host: &str, port: u16) -> Endpoint {
    Endpoint::new(host, port).unwrap()
}

// ── Steady-state scenario ─────────────────────────────────────

#[test]
fn connect_then_report_sends_latest_reading() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_statuses(&rx, 2), vec![Connecting, Connected]);

    // Several empty ticks: nothing written.
    std::thread::sleep(Duration::from_millis(100));
    assert!(connector.rec.sends().is_empty());

    uplink.report_sample(Channel::Light, &[350.0]);
    assert!(connector.rec.wait_until(|r| !r.sends().is_empty()));
    assert_eq!(connector.rec.sends()[0], b"{\"Light\":350.0}\n".to_vec());
    assert_eq!(connector.rec.opens(), vec![ep("10.0.0.5", 9000)]);
}

#[test]
fn latest_value_per_channel_wins() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    let reporter = uplink.reporter();
    reporter.report(Channel::Light, &[1.0]);
    reporter.report(Channel::Light, &[2.0]);
    assert!(connector.rec.wait_until(|r| {
        r.sends().last().is_some_and(|s| s == b"{\"Light\":2.0}\n")
    }));
}

// ── Reconnect guards ──────────────────────────────────────────

#[test]
fn connect_same_endpoint_while_connected_reannounces_once() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    let again = next_update(&rx);
    assert_eq!(again.status, Connected);
    assert_eq!(again.message, "connected to 10.0.0.5:9000");
    assert_quiet(&rx);
    assert_eq!(connector.rec.opens().len(), 1);
}

#[test]
fn connect_same_endpoint_while_connecting_is_ignored() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    connector.rec.hold_opens();

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_update(&rx).status, Connecting);
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert!(rx.try_recv().is_none());

    connector.rec.release();
    assert_eq!(next_update(&rx).status, Connected);
    assert_quiet(&rx);
    assert_eq!(connector.rec.opens_started(), 1);
}

#[test]
fn redirect_tears_down_old_link_first() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    uplink.connect(ep("10.0.0.6", 9001)).unwrap();
    assert_eq!(next_statuses(&rx, 3), vec![Disconnected, Connecting, Connected]);
    assert_eq!(uplink.endpoint(), Some(ep("10.0.0.6", 9001)));
    assert_eq!(
        connector.rec.opens(),
        vec![ep("10.0.0.5", 9000), ep("10.0.0.6", 9001)]
    );
    assert!(connector.rec.wait_until(|r| r.closes() == vec![ep("10.0.0.5", 9000)]));
}

#[test]
fn redirect_to_refusing_endpoint_ends_failed() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    connector.rec.set_refuse(true);
    uplink.connect(ep("10.0.0.6", 9001)).unwrap();
    assert_eq!(next_statuses(&rx, 3), vec![Disconnected, Connecting, Failed]);
    assert_quiet(&rx);

    assert!(uplink.endpoint().is_none());
    assert_eq!(connector.rec.opens(), vec![ep("10.0.0.5", 9000)]);
    assert!(connector.rec.wait_until(|r| r.closes() == vec![ep("10.0.0.5", 9000)]));
}

// ── Failure handling ──────────────────────────────────────────

#[test]
fn send_failure_yields_exactly_one_failed() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    connector.rec.set_fail_sends(true);
    uplink.report_sample(Channel::Accelerometer, &[0.1, 9.8, 0.0]);

    let failed = next_update(&rx);
    assert_eq!(failed.status, Failed);
    assert!(failed.message.starts_with("send failed:"), "{}", failed.message);
    assert_quiet(&rx);

    assert!(connector.rec.sends().is_empty());
    assert_eq!(connector.rec.closes().len(), 1);
    assert!(uplink.endpoint().is_none());
}

#[test]
fn refused_connect_fails_then_fresh_connect_recovers() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    connector.rec.set_refuse(true);

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_update(&rx).status, Connecting);
    let failed = next_update(&rx);
    assert_eq!(failed.status, Failed);
    assert!(failed.message.starts_with("connection failed:"), "{}", failed.message);
    assert_eq!(uplink.status(), failed);

    connector.rec.set_refuse(false);
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_statuses(&rx, 2), vec![Connecting, Connected]);
}

// ── Disconnect ────────────────────────────────────────────────

#[test]
fn disconnect_is_idempotent() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    uplink.disconnect();
    let down = next_update(&rx);
    assert_eq!(down.status, Disconnected);
    assert_eq!(down.message, "disconnected");

    uplink.disconnect();
    uplink.handle_command(UplinkCommand::Disconnect).unwrap();
    assert_quiet(&rx);
    assert!(connector.rec.wait_until(|r| r.closes().len() == 1));
}

#[test]
fn disconnect_while_connecting_discards_late_link() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    connector.rec.hold_opens();

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_update(&rx).status, Connecting);
    uplink.disconnect();
    assert_eq!(next_update(&rx).status, Disconnected);

    connector.rec.release();
    assert!(connector.rec.wait_until(|r| r.closes().len() == 1));
    assert_quiet(&rx);
    assert_eq!(uplink.status().status, Disconnected);
}

#[test]
fn disconnect_clears_buffered_samples() {
    let (uplink, _connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    uplink.report_sample(Channel::Light, &[10.0]);
    uplink.disconnect();
    assert!(uplink.store().is_empty());
}

#[test]
fn drop_closes_the_link() {
    let (uplink, connector) = make_uplink();
    let rx = uplink.subscribe();
    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    next_statuses(&rx, 2);

    drop(uplink);
    assert_eq!(connector.rec.closes().len(), 1);
}

// ── Observers ─────────────────────────────────────────────────

struct Collect(Arc<Mutex<Vec<StatusUpdate>>>);

impl StatusObserver for Collect {
    fn on_status(&mut self, update: &StatusUpdate) {
        self.0.lock().unwrap().push(update.clone());
    }
}

#[test]
fn inline_observer_sees_same_sequence_as_queue() {
    let (uplink, _connector) = make_uplink();
    let seen = Arc::new(Mutex::new(Vec::new()));
    uplink.add_observer(Collect(seen.clone()));
    let rx = uplink.subscribe();

    uplink
        .handle_command(UplinkCommand::Connect(ep("10.0.0.5", 9000)))
        .unwrap();
    let queued = vec![next_update(&rx), next_update(&rx)];
    uplink.disconnect();
    let last = next_update(&rx);

    let inline = seen.lock().unwrap().clone();
    assert_eq!(inline.len(), 3);
    assert_eq!(inline[..2], queued[..]);
    assert_eq!(inline[2], last);
}

struct RejectConnected;

impl StatusObserver for RejectConnected {
    fn on_status(&mut self, update: &StatusUpdate) {
        assert_ne!(update.status, Connected, "observer gave up");
    }
}

#[test]
fn panicking_observer_does_not_stall_session() {
    let (uplink, connector) = make_uplink();
    uplink.add_observer(RejectConnected);
    let rx = uplink.subscribe();

    uplink.connect(ep("10.0.0.5", 9000)).unwrap();
    assert_eq!(next_statuses(&rx, 2), vec![Connecting, Connected]);

    uplink.report_sample(Channel::Light, &[350.0]);
    assert!(connector.rec.wait_until(|r| !r.sends().is_empty()));
    assert_eq!(uplink.status().status, Connected);

    uplink.disconnect();
    assert_eq!(next_update(&rx).status, Disconnected);
}
