use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pingstat_common::error::ProbeError;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::{NO_REPLY_ADDR, RouteTrace, UNKNOWN_REPLY_ADDR};
use pingstat_core::tracer::RouteTracer;
use tokio_util::sync::CancellationToken;

use crate::sim::{Responder, Route, SimFactory, SimNetwork};

const DEST: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);
const HOP_TIMEOUT: Duration = Duration::from_millis(40);

fn router(n: u8) -> Responder {
    Responder::Router(Ipv4Addr::new(10, 0, 0, n))
}

fn tracer_for(route: Route) -> RouteTracer {
    let network = SimNetwork::new();
    network.add_route(DEST, route);
    RouteTracer::new(Arc::new(SimFactory(network)))
}

fn assert_contiguous(trace: &RouteTrace) {
    for (index, record) in trace.hops.iter().enumerate() {
        assert_eq!(usize::from(record.hop), index + 1, "gap in {:?}", trace.hops);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn two_routers_then_destination() {
    let tracer = tracer_for(Route::via(vec![router(1), router(2)]));

    let trace = tracer.trace(&ProbeTarget::from(DEST), 3, HOP_TIMEOUT).await.unwrap();

    assert_eq!(trace.len(), 3);
    assert_contiguous(&trace);
    assert_eq!(trace.hops[0].address, "10.0.0.1");
    assert_eq!(trace.hops[1].address, "10.0.0.2");
    let last = trace.last().unwrap();
    assert!(last.success);
    assert_eq!(last.address, DEST.to_string());
    assert!(trace.reached);
}

#[tokio::test(flavor = "multi_thread")]
async fn stops_at_destination_before_max_hops() {
    let tracer = tracer_for(Route::via(vec![router(1)]));

    let trace = tracer.trace(&ProbeTarget::from(DEST), 30, HOP_TIMEOUT).await.unwrap();

    assert_eq!(trace.len(), 2);
    assert!(trace.reached);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_destination_fills_max_hops() {
    let tracer = tracer_for(Route::via(vec![router(1), Responder::Silent]).never_answers());

    let trace = tracer.trace(&ProbeTarget::from(DEST), 5, HOP_TIMEOUT).await.unwrap();

    assert_eq!(trace.len(), 5);
    assert_contiguous(&trace);
    assert!(!trace.reached);
    assert!(trace.hops[0].success);
    for record in &trace.hops[1..] {
        assert_eq!(record.address, NO_REPLY_ADDR);
        assert!(!record.success);
        assert_eq!(record.rtt_ms, 0.0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_hop_is_unknown_and_trace_goes_on() {
    let tracer = tracer_for(Route::via(vec![router(1), Responder::Garbage, router(3)]));

    let trace = tracer.trace(&ProbeTarget::from(DEST), 30, HOP_TIMEOUT).await.unwrap();

    assert_eq!(trace.len(), 4);
    assert_eq!(trace.hops[1].address, UNKNOWN_REPLY_ADDR);
    assert!(!trace.hops[1].success);
    assert_eq!(trace.hops[2].address, "10.0.0.3");
    assert!(trace.reached);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_hop_is_unknown_and_trace_goes_on() {
    let unreachable = Responder::Unreachable(Ipv4Addr::new(10, 0, 0, 1));
    let tracer = tracer_for(Route::via(vec![unreachable, router(2)]));

    let trace = tracer.trace(&ProbeTarget::from(DEST), 30, HOP_TIMEOUT).await.unwrap();

    assert_eq!(trace.len(), 3);
    assert_contiguous(&trace);
    assert_eq!(trace.hops[0].address, UNKNOWN_REPLY_ADDR);
    assert!(!trace.hops[0].success);
    assert!(trace.hops[0].rtt_ms > 0.0);
    assert_eq!(trace.hops[1].address, "10.0.0.2");
    assert!(trace.hops[1].success);
    assert_eq!(trace.hops[2].address, DEST.to_string());
    assert!(trace.reached);
}

#[tokio::test(flavor = "multi_thread")]
async fn unresolvable_target_aborts_trace() {
    let tracer = tracer_for(Route::via(vec![router(1)]));

    let err = tracer
        .trace(&ProbeTarget::new("no-such-host.invalid"), 30, HOP_TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::ResolutionFailure { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_between_hops_keeps_prefix() {
    let tracer = tracer_for(Route::via(vec![Responder::Silent; 30]).never_answers());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let trace = tracer
        .trace_until(&ProbeTarget::from(DEST), 30, HOP_TIMEOUT, &cancel)
        .await
        .unwrap();

    assert!(!trace.is_empty());
    assert!(trace.len() < 30);
    assert_contiguous(&trace);
    assert!(!trace.reached);
}

#[tokio::test(flavor = "multi_thread")]
async fn mtr_rounds_accumulate_per_hop() {
    let tracer = tracer_for(Route::via(vec![router(1)]));

    let report = tracer
        .mtr(&ProbeTarget::from(DEST), 3, 10, HOP_TIMEOUT, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.rounds, 3);
    assert_eq!(report.hops.len(), 2);
    assert_eq!(report.hops[0].addresses, vec![Ipv4Addr::new(10, 0, 0, 1)]);
    assert_eq!(report.hops[0].sent, 3);
    assert_eq!(report.hops[0].received, 3);
    assert_eq!(report.hops[1].addresses, vec![DEST]);
    assert_eq!(report.hops[1].loss_percent, 0.0);
}
