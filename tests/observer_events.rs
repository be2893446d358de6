//! The transport delivers inbound events through the observer interface;
//! the telemetry observer is the concrete implementation that feeds the
//! shared statistics engine.

use std::sync::Arc;

use meshstat::node::{NullObserver, TelemetryObserver, TransportObserver};
use meshstat::stats::clock::Clock;
use meshstat::stats::{self, ForwardDirection};

struct FixedClock;

impl Clock for FixedClock {
    fn now_epoch(&self) -> i64 {
        1_700_000_000
    }
}

#[test]
fn test_received_events_update_peer_and_link() {
    let shared = stats::shared(Arc::new(FixedClock));
    let observer = TelemetryObserver::new(shared.clone());

    observer.on_message_received(7);
    observer.on_message_received(7);
    observer.on_forward_preview(104);

    let stats = stats::lock(&shared);
    assert_eq!(stats.peer(7).received, 2);
    assert_eq!(stats.peer(104).received, 1);
    assert_eq!(stats.link().received, 3);
}

#[test]
fn test_sent_events_estimate_retries_once() {
    let shared = stats::shared(Arc::new(FixedClock));
    let observer = TelemetryObserver::new(shared.clone());

    observer.on_message_sent(0, -45);

    let stats = stats::lock(&shared);
    assert_eq!(stats.peer(0).sent, 1);
    assert_eq!(stats.peer(0).retries, 2);
    assert_eq!(stats.link().sent, 1);
    let arc = stats.arc_aggregate();
    assert_eq!((arc.packets, arc.retries), (1, 2));
}

#[test]
fn test_forward_and_error_events() {
    let shared = stats::shared(Arc::new(FixedClock));
    let observer = TelemetryObserver::new(shared.clone());

    observer.on_forward_traffic(ForwardDirection::Received);
    observer.on_forward_traffic(ForwardDirection::Sent);
    observer.on_transmit_error();

    let link = stats::lock(&shared).link();
    assert_eq!(link.forwarded_received, 1);
    assert_eq!(link.forwarded_sent, 1);
    assert_eq!(link.errors, 1);
}

#[test]
fn test_null_observer_accepts_everything() {
    // The no-op default implementation must be callable across the whole
    // interface without side effects.
    let observer = NullObserver;
    observer.on_message_received(1);
    observer.on_forward_preview(2);
    observer.on_message_sent(3, -80);
    observer.on_forward_traffic(ForwardDirection::Sent);
    observer.on_transmit_error();
    observer.on_command("status");
}

#[test]
fn test_observer_is_object_safe() {
    let shared = stats::shared(Arc::new(FixedClock));
    let observers: Vec<Box<dyn TransportObserver>> = vec![
        Box::new(NullObserver),
        Box::new(TelemetryObserver::new(shared.clone())),
    ];
    for observer in &observers {
        observer.on_message_received(42);
    }
    assert_eq!(stats::lock(&shared).peer(42).received, 1);
}
