use std::time::Duration;

use colored::*;
use pingstat_common::config::TraceConfig;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::{HopSummary, MtrReport};
use pingstat_core::network::transport::default_factory;
use pingstat_core::tracer::RouteTracer;
use tokio_util::sync::CancellationToken;

use crate::terminal::{colors, format, print};

pub async fn mtr(
    host: &ProbeTarget,
    rounds: u16,
    max_hops: u8,
    timeout: Duration,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    TraceConfig { max_hops, timeout }.validate()?;
    if rounds == 0 {
        anyhow::bail!("rounds must be positive");
    }

    let tracer = RouteTracer::new(default_factory());
    let report: MtrReport = tracer.mtr(host, rounds, max_hops, timeout, cancel).await?;

    if json {
        return print::json(&report);
    }

    print::header(&format!("mtr to {host}"));
    print::aligned_line("Destination", 11, report.destination.to_string().color(colors::IPV4_ADDR));
    print::aligned_line("Rounds", 11, report.rounds.to_string());
    print::fat_separator();
    for hop in &report.hops {
        print::print(&hop_row(hop));
    }
    print::end_of_program();
    Ok(())
}

fn hop_row(hop: &HopSummary) -> String {
    let index = format!("{:>3}", hop.hop).color(colors::ACCENT);
    let address = match hop.addresses.first() {
        Some(addr) if hop.addresses.len() > 1 => format!("{addr} (+{})", hop.addresses.len() - 1),
        Some(addr) => addr.to_string(),
        None => "*".to_string(),
    };
    format!(
        "{index}  {} {}  {}/{}  {}",
        format!("{address:<22}").color(colors::IPV4_ADDR),
        format::padded_loss(hop.loss_percent, 7),
        hop.received,
        hop.sent,
        format::rtt_range(hop.min_rtt_ms, hop.avg_rtt_ms, hop.max_rtt_ms, hop.received)
    )
}
