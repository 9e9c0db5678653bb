use std::time::{Duration, Instant};

use colored::*;
use pingstat_common::config::TraceConfig;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::RouteTrace;
use pingstat_core::network::transport::default_factory;
use pingstat_core::tracer::RouteTracer;
use tokio_util::sync::CancellationToken;

use crate::terminal::{colors, format, print};

pub async fn trace(
    host: &ProbeTarget,
    max_hops: u8,
    timeout: Duration,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let config = TraceConfig { max_hops, timeout };
    config.validate()?;

    let tracer = RouteTracer::new(default_factory());
    let start_time: Instant = Instant::now();
    let route: RouteTrace = tracer
        .trace_until(host, config.max_hops, config.timeout, cancel)
        .await?;

    if json {
        return print::json(&route);
    }

    print::header(&format!("route to {host}"));
    print::aligned_line("Destination", 11, route.destination.to_string().color(colors::IPV4_ADDR));
    print::fat_separator();
    for record in &route.hops {
        print::print(&format::hop_line(record));
    }
    print_outcome(&route, start_time.elapsed());
    Ok(())
}

fn print_outcome(route: &RouteTrace, total_time: Duration) {
    let hops: ColoredString = format!("{} hops", route.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let verdict: ColoredString = if route.reached {
        "destination reached".green()
    } else {
        "destination not reached".red()
    };

    print::fat_separator();
    print::centerln(&format!("{verdict}: {hops} in {total_time}"));
}
