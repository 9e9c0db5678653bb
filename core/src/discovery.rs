//! # Default Host Discovery
//!
//! Builds the host list used when the caller supplies none: this device,
//! the first routers towards the internet, then well-known public resolvers.
//! Each source is best effort; a failing source is logged and skipped.

use std::net::Ipv4Addr;
use std::time::Duration;

use pingstat_common::network::interface;
use pingstat_common::network::target::ProbeTarget;
use tracing::{debug, warn};

use crate::tracer::RouteTracer;

pub const PUBLIC_RESOLVERS: [Ipv4Addr; 3] = [
    Ipv4Addr::new(8, 8, 8, 8),
    Ipv4Addr::new(1, 1, 1, 1),
    Ipv4Addr::new(77, 88, 8, 8),
];

/// Destination whose first hops are added to the default list.
pub const HOP_PROBE_TARGET: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);
pub const FIRST_HOPS: u8 = 3;

const HOP_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn default_hosts(tracer: &RouteTracer) -> Vec<ProbeTarget> {
    let device = interface::get_device_ipv4();
    if device.is_none() {
        warn!("no usable IPv4 interface found, skipping device address");
    }

    let hops = match tracer
        .trace(&ProbeTarget::from(HOP_PROBE_TARGET), FIRST_HOPS, HOP_TIMEOUT)
        .await
    {
        Ok(trace) => trace
            .hops
            .iter()
            .filter(|hop| hop.success)
            .filter_map(|hop| hop.address.parse::<Ipv4Addr>().ok())
            .collect(),
        Err(e) => {
            warn!("could not trace first hops: {e}");
            Vec::new()
        }
    };

    let hosts = merge_hosts(device, &hops, &PUBLIC_RESOLVERS);
    debug!("default hosts: {hosts:?}");
    hosts
}

/// Orders the sources and drops repeats, first occurrence wins.
fn merge_hosts(
    device: Option<Ipv4Addr>,
    hops: &[Ipv4Addr],
    resolvers: &[Ipv4Addr],
) -> Vec<ProbeTarget> {
    let mut hosts: Vec<ProbeTarget> = Vec::new();
    let candidates = device
        .into_iter()
        .chain(hops.iter().copied())
        .chain(resolvers.iter().copied());
    for addr in candidates {
        let target = ProbeTarget::from(addr);
        if !hosts.contains(&target) {
            hosts.push(target);
        }
    }
    hosts
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
