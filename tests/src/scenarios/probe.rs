use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pingstat_common::network::target::ProbeTarget;
use pingstat_core::prober::Prober;

use crate::sim::{Echo, Route, SimFactory, SimNetwork};

const HOST: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 10);
const TIMEOUT: Duration = Duration::from_millis(150);
/// Allowed overshoot of a measured RTT over the simulated delay.
const SLACK_MS: f64 = 8.0;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn prober_for(route: Route) -> (Prober, Arc<SimNetwork>) {
    let network = SimNetwork::new();
    network.add_route(HOST, route);
    (Prober::new(Arc::new(SimFactory(Arc::clone(&network)))), network)
}

fn assert_close(measured: f64, expected: f64) {
    assert!(
        measured >= expected && measured < expected + SLACK_MS,
        "measured {measured}ms, expected about {expected}ms"
    );
}

#[test]
fn one_timeout_out_of_four() {
    let route = Route::direct(ms(10)).echoes(vec![
        Echo::After(ms(10)),
        Echo::After(ms(12)),
        Echo::After(ms(11)),
        Echo::Dropped,
    ]);
    let (prober, network) = prober_for(route);

    let stats = prober.probe(&ProbeTarget::from(HOST), 4, TIMEOUT).unwrap();

    assert_eq!(network.echoes_sent(HOST), 4);
    assert_eq!(stats.sent, 4);
    assert_eq!(stats.received, 3);
    assert_eq!(stats.packet_loss, 25.0);
    assert_close(stats.min_rtt_ms, 10.0);
    assert_close(stats.max_rtt_ms, 12.0);
    assert_close(stats.avg_rtt_ms, 11.0);
    assert!(stats.min_rtt_ms <= stats.avg_rtt_ms && stats.avg_rtt_ms <= stats.max_rtt_ms);
}

#[test]
fn every_reply_received() {
    let (prober, _network) = prober_for(Route::direct(ms(3)));

    let stats = prober.probe(&ProbeTarget::from(HOST), 5, TIMEOUT).unwrap();

    assert_eq!(stats.packet_loss, 0.0);
    assert_eq!(stats.received, 5);
    assert!(stats.min_rtt_ms <= stats.avg_rtt_ms && stats.avg_rtt_ms <= stats.max_rtt_ms);
}

#[test]
fn silent_host_reports_zero_rtt() {
    let (prober, _network) = prober_for(Route::direct(ms(3)).never_answers());

    let stats = prober.probe(&ProbeTarget::from(HOST), 3, ms(30)).unwrap();

    assert_eq!(stats.packet_loss, 100.0);
    assert_eq!(stats.received, 0);
    assert_eq!((stats.min_rtt_ms, stats.avg_rtt_ms, stats.max_rtt_ms), (0.0, 0.0, 0.0));
    assert!(!stats.is_reachable());
}

#[test]
fn foreign_identifier_is_not_counted() {
    let mut route = Route::direct(ms(8));
    route.foreign_first = true;
    let (prober, _network) = prober_for(route);

    let stats = prober.probe(&ProbeTarget::from(HOST), 3, TIMEOUT).unwrap();

    // The foreign reply lands at 4ms; only the real one at 8ms may count.
    assert_eq!(stats.received, 3);
    assert_close(stats.min_rtt_ms, 8.0);
}

#[test]
fn malformed_replies_count_as_loss() {
    let route = Route::direct(ms(3)).echoes(vec![Echo::Garbage, Echo::After(ms(3))]);
    let (prober, _network) = prober_for(route);

    let stats = prober.probe(&ProbeTarget::from(HOST), 2, ms(40)).unwrap();

    assert_eq!(stats.received, 1);
    assert_eq!(stats.packet_loss, 50.0);
}

#[test]
fn unresolvable_host_is_data_not_error() {
    let (prober, _network) = prober_for(Route::direct(ms(3)));

    let stats = prober
        .probe(&ProbeTarget::new("no-such-host.invalid"), 4, TIMEOUT)
        .unwrap();

    assert_eq!(stats.packet_loss, 100.0);
    assert_eq!(stats.avg_rtt_ms, 0.0);
    assert_eq!(stats.address, None);
}
