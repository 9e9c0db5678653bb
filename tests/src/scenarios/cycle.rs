use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pingstat_common::config::{MonitorConfig, ProbeConfig};
use pingstat_common::network::target::ProbeTarget;
use pingstat_core::aggregator::StatsAggregator;
use pingstat_core::prober::Prober;
use pingstat_core::scheduler::Scheduler;
use tokio_util::sync::CancellationToken;

use crate::sim::{Echo, Route, SimFactory, SimNetwork};

const TIMEOUT: Duration = Duration::from_millis(150);

fn addr(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, last)
}

fn scheduler_on(network: &Arc<SimNetwork>) -> Scheduler {
    let prober = Prober::new(Arc::new(SimFactory(Arc::clone(network))));
    Scheduler::new(Arc::new(prober), Arc::new(StatsAggregator::new()))
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolvable_host_does_not_stop_the_cycle() {
    let network = SimNetwork::new();
    network.add_route(addr(1), Route::direct(Duration::from_millis(3)));
    network.add_route(addr(2), Route::direct(Duration::from_millis(3)));
    let scheduler = scheduler_on(&network);

    let hosts = vec![
        ProbeTarget::from(addr(1)),
        ProbeTarget::new("no-such-host.invalid"),
        ProbeTarget::from(addr(2)),
    ];
    let summary = scheduler
        .run_cycle(&hosts, 2, TIMEOUT, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.launched, 3);
    assert_eq!(summary.completed, 3);
    let snapshot = scheduler.aggregator().snapshot();
    let broken = &snapshot[&ProbeTarget::new("no-such-host.invalid")];
    assert_eq!(broken.packet_loss, 100.0);
    assert_eq!((broken.min_rtt_ms, broken.avg_rtt_ms, broken.max_rtt_ms), (0.0, 0.0, 0.0));
    assert_eq!(snapshot[&ProbeTarget::from(addr(1))].packet_loss, 0.0);
    assert_eq!(snapshot[&ProbeTarget::from(addr(2))].packet_loss, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_cycles_keep_hosts_apart() {
    let network = SimNetwork::new();
    let delays = [(1u8, 4u64), (2, 14), (3, 24), (4, 34)];
    for (host, delay) in delays {
        network.add_route(addr(host), Route::direct(Duration::from_millis(delay)));
    }
    let scheduler = scheduler_on(&network);
    let cancel = CancellationToken::new();

    let ab = vec![ProbeTarget::from(addr(1)), ProbeTarget::from(addr(2))];
    let cd = vec![ProbeTarget::from(addr(3)), ProbeTarget::from(addr(4))];
    let (left, right) = tokio::join!(
        scheduler.run_cycle(&ab, 3, TIMEOUT, &cancel),
        scheduler.run_cycle(&cd, 3, TIMEOUT, &cancel),
    );
    assert_eq!(left.unwrap().completed, 2);
    assert_eq!(right.unwrap().completed, 2);

    let snapshot = scheduler.aggregator().snapshot();
    assert_eq!(snapshot.len(), 4);
    for (host, delay) in delays {
        let stats = &snapshot[&ProbeTarget::from(addr(host))];
        let expected = delay as f64;
        assert_eq!(stats.received, 3, "{host}: {stats:?}");
        assert!(
            stats.min_rtt_ms >= expected && stats.max_rtt_ms < expected + 8.0,
            "host {host} expected about {expected}ms, got {stats:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_cycle_sends_nothing() {
    let network = SimNetwork::new();
    network.add_route(addr(1), Route::direct(Duration::from_millis(3)));
    let scheduler = scheduler_on(&network);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = scheduler
        .run_cycle(&[ProbeTarget::from(addr(1))], 4, TIMEOUT, &cancel)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(network.echoes_sent(addr(1)), 0);
    assert!(scheduler.aggregator().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn later_cycle_replaces_stale_values() {
    let network = SimNetwork::new();
    let flaky = Route::direct(Duration::from_millis(3)).echoes(vec![
        Echo::After(Duration::from_millis(3)),
        Echo::Dropped,
    ]);
    network.add_route(addr(9), flaky);
    let scheduler = scheduler_on(&network);

    let mut config = MonitorConfig::new(vec![ProbeTarget::from(addr(9))]);
    config.interval = Duration::from_millis(20);
    config.probe = ProbeConfig {
        attempts: 1,
        timeout: Duration::from_millis(40),
    };
    config.max_cycles = Some(2);

    let mut losses = Vec::new();
    let cycles = scheduler
        .run_periodic(&config, &CancellationToken::new(), |_, _, snapshot| {
            let stats = &snapshot[&ProbeTarget::from(addr(9))];
            losses.push((stats.packet_loss, stats.avg_rtt_ms));
        })
        .await
        .unwrap();

    assert_eq!(cycles, 2);
    assert_eq!(losses[0].0, 0.0);
    assert!(losses[0].1 > 0.0);
    assert_eq!(losses[1], (100.0, 0.0));
}
