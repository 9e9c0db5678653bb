use std::sync::Arc;
use std::time::Duration;

use colored::*;
use pingstat_common::config::{MonitorConfig, ProbeConfig};
use pingstat_common::network::target::{ProbeTarget, parse_host_list};
use pingstat_common::stats::HostStats;
use pingstat_core::aggregator::StatsAggregator;
use pingstat_core::discovery;
use pingstat_core::network::transport::default_factory;
use pingstat_core::prober::Prober;
use pingstat_core::scheduler::{CycleSummary, Scheduler};
use pingstat_core::tracer::RouteTracer;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ping::{ordered, print_snapshot};
use crate::terminal::print;

pub struct MonitorArgs<'a> {
    pub hosts: Option<&'a str>,
    pub interval: Duration,
    pub cycles: Option<u64>,
    pub defaults: bool,
    pub count: u16,
    pub timeout: Duration,
    pub json: bool,
}

#[derive(Serialize)]
struct CycleReport<'a> {
    cycle: u64,
    summary: &'a CycleSummary,
    hosts: Vec<&'a HostStats>,
}

pub async fn monitor(args: MonitorArgs<'_>, cancel: &CancellationToken) -> anyhow::Result<()> {
    let mut hosts: Vec<ProbeTarget> = match args.hosts {
        Some(list) => parse_host_list(list).map_err(anyhow::Error::msg)?,
        None => Vec::new(),
    };

    if args.defaults || hosts.is_empty() {
        print::print_status("Collecting default hosts...");
        let tracer = RouteTracer::new(default_factory());
        let mut defaults = discovery::default_hosts(&tracer).await;
        defaults.retain(|host| !hosts.contains(host));
        defaults.append(&mut hosts);
        hosts = defaults;
    }

    let config = MonitorConfig {
        hosts,
        interval: args.interval,
        probe: ProbeConfig {
            attempts: args.count,
            timeout: args.timeout,
        },
        max_cycles: args.cycles,
    };
    config.validate()?;
    info!(
        "monitoring {} hosts every {}s",
        config.hosts.len(),
        config.interval.as_secs()
    );

    let aggregator = Arc::new(StatsAggregator::new());
    let prober = Arc::new(Prober::new(default_factory()));
    let scheduler = Scheduler::new(prober, Arc::clone(&aggregator));
    let json = args.json;
    let hosts = config.hosts.clone();

    let cycles = scheduler
        .run_periodic(&config, cancel, |cycle, summary, snapshot| {
            if json {
                let report = CycleReport {
                    cycle,
                    summary,
                    hosts: ordered(&hosts, snapshot),
                };
                if let Err(e) = print::json(&report) {
                    warn!("could not render cycle {cycle}: {e}");
                }
                return;
            }
            print::header(&format!("cycle {cycle}"));
            print_snapshot(&hosts, snapshot);
            if summary.failed > 0 {
                warn!("{} of {} hosts failed this cycle", summary.failed, summary.launched);
            }
        })
        .await?;

    if !json {
        print::header("final statistics");
        print_snapshot(&hosts, &aggregator.snapshot());
        print::fat_separator();
        print::centerln(&format!("{} cycles run", cycles.to_string().bold().green()));
    }
    Ok(())
}
