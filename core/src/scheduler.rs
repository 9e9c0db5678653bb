//! # Collection Scheduler
//!
//! Fans one probe task out per host, feeds each result into the
//! [`StatsAggregator`] as soon as it lands and waits for the whole cycle.
//! A failing host never stalls or aborts its siblings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pingstat_common::config::{MonitorConfig, require_nonzero_duration, require_positive};
use pingstat_common::error::Result;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::HostStats;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::{StatsAggregator, StatsSnapshot};

/// Slack on top of `attempts * timeout` for resolution and socket setup.
pub const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Anything able to probe one host asynchronously.
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn probe(
        &self,
        target: ProbeTarget,
        attempts: u16,
        timeout: Duration,
    ) -> Result<HostStats>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub launched: usize,
    pub completed: usize,
    /// Probes that returned an error; recorded as 100% loss.
    pub failed: usize,
    /// Hosts never launched because the cycle was cancelled.
    pub skipped: usize,
}

pub struct Scheduler {
    prober: Arc<dyn HostProbe>,
    aggregator: Arc<StatsAggregator>,
}

impl Scheduler {
    pub fn new(prober: Arc<dyn HostProbe>, aggregator: Arc<StatsAggregator>) -> Self {
        Self { prober, aggregator }
    }

    pub fn aggregator(&self) -> &Arc<StatsAggregator> {
        &self.aggregator
    }

    /// Probes every host concurrently and returns once all launched probes
    /// have finished. Cancellation stops further launches only.
    ///
    /// A probe still running after `attempts * timeout + PROBE_GRACE` is
    /// abandoned and its host recorded as unreachable.
    pub async fn run_cycle(
        &self,
        hosts: &[ProbeTarget],
        attempts: u16,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CycleSummary> {
        let attempts = require_positive("attempts", attempts)?;
        let timeout = require_nonzero_duration("timeout", timeout)?;

        let mut summary = CycleSummary::default();
        if hosts.is_empty() {
            debug!("empty host list, nothing to probe");
            return Ok(summary);
        }

        let budget = timeout.saturating_mul(u32::from(attempts)).saturating_add(PROBE_GRACE);
        let mut tasks = JoinSet::new();
        for (index, host) in hosts.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped = hosts.len() - index;
                info!("cycle cancelled, {} hosts not launched", summary.skipped);
                break;
            }

            let prober = Arc::clone(&self.prober);
            let aggregator = Arc::clone(&self.aggregator);
            let host = host.clone();
            tasks.spawn(async move {
                let probe = prober.probe(host.clone(), attempts, timeout);
                let (stats, failed) = match tokio::time::timeout(budget, probe).await {
                    Ok(Ok(stats)) => (stats, false),
                    Ok(Err(e)) if e.is_recoverable() => {
                        debug!("probe of {host} gave up: {e}");
                        (HostStats::unreachable(host.clone(), None), true)
                    }
                    Ok(Err(e)) => {
                        warn!("probe of {host} failed: {e}");
                        (HostStats::unreachable(host.clone(), None), true)
                    }
                    Err(_) => {
                        warn!("probe of {host} still running after {budget:?}, abandoning it");
                        (HostStats::unreachable(host.clone(), None), true)
                    }
                };
                aggregator.update(host, stats);
                failed
            });
            summary.launched += 1;
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(false) => summary.completed += 1,
                Ok(true) => summary.failed += 1,
                Err(e) => {
                    warn!("probe task aborted: {e}");
                    summary.failed += 1;
                }
            }
        }

        debug!("cycle finished: {summary:?}");
        Ok(summary)
    }

    /// Runs a cycle now and then every `config.interval` until `cancel`
    /// fires or `config.max_cycles` cycles ran. Returns the cycle count.
    pub async fn run_periodic<F>(
        &self,
        config: &MonitorConfig,
        cancel: &CancellationToken,
        mut on_cycle: F,
    ) -> Result<u64>
    where
        F: FnMut(u64, &CycleSummary, &StatsSnapshot) + Send,
    {
        let interval = require_nonzero_duration("interval", config.interval)?;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles: u64 = 0;
        loop {
            if config.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let probe = &config.probe;
                    let summary = self
                        .run_cycle(&config.hosts, probe.attempts, probe.timeout, cancel)
                        .await?;
                    cycles += 1;
                    if summary.launched > 0 && summary.failed == summary.launched {
                        warn!("every host failed in cycle {cycles}");
                    }
                    on_cycle(cycles, &summary, &self.aggregator.snapshot());
                }
            }
        }

        info!("monitoring stopped after {cycles} cycles");
        Ok(cycles)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
