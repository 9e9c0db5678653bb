use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use pingstat_common::config::ProbeConfig;
use pingstat_common::network::target::{ProbeTarget, parse_host_list};
use pingstat_common::stats::HostStats;
use pingstat_core::aggregator::{StatsAggregator, StatsSnapshot};
use pingstat_core::network::transport::default_factory;
use pingstat_core::prober::Prober;
use pingstat_core::scheduler::{CycleSummary, Scheduler};
use tokio_util::sync::CancellationToken;

use crate::mprint;
use crate::terminal::{colors, format, print};

pub async fn ping(
    hosts: &str,
    count: u16,
    timeout: Duration,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let hosts: Vec<ProbeTarget> = parse_host_list(hosts).map_err(anyhow::Error::msg)?;
    if hosts.is_empty() {
        anyhow::bail!("no hosts given");
    }
    let config = ProbeConfig { attempts: count, timeout };
    config.validate()?;

    let aggregator = Arc::new(StatsAggregator::new());
    let prober = Arc::new(Prober::new(default_factory()));
    let scheduler = Scheduler::new(prober, Arc::clone(&aggregator));

    let start_time: Instant = Instant::now();
    let summary = scheduler
        .run_cycle(&hosts, config.attempts, config.timeout, cancel)
        .await?;
    let snapshot = aggregator.snapshot();

    if json {
        return print::json(&ordered(&hosts, &snapshot));
    }

    print::header("ping statistics");
    print_snapshot(&hosts, &snapshot);
    print_summary(&summary, start_time.elapsed());
    Ok(())
}

/// Entries in the order the hosts were given.
pub fn ordered<'a>(hosts: &[ProbeTarget], snapshot: &'a StatsSnapshot) -> Vec<&'a HostStats> {
    hosts.iter().filter_map(|host| snapshot.get(host)).collect()
}

pub fn print_snapshot(hosts: &[ProbeTarget], snapshot: &StatsSnapshot) {
    let entries = ordered(hosts, snapshot);
    for (idx, stats) in entries.iter().enumerate() {
        print::tree_head(idx, stats.host.host());
        print::as_tree_one_level(format::host_details(stats));
        if idx + 1 != entries.len() {
            mprint!();
        }
    }
}

pub fn print_summary(summary: &CycleSummary, total_time: Duration) {
    let probed: ColoredString = format!("{} hosts", summary.completed + summary.failed)
        .bold()
        .green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let mut output = format!("Cycle complete: {probed} probed in {total_time}");
    if summary.failed > 0 {
        output.push_str(&format!(", {} failed", summary.failed.to_string().red().bold()));
    }
    if summary.skipped > 0 {
        output.push_str(&format!(", {} skipped", summary.skipped.to_string().yellow()));
    }

    print::fat_separator();
    print::centerln(&format!("{}", output.color(colors::TEXT_DEFAULT)));
}
