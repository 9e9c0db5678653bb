//! Repeated traces condensed into per-hop statistics.

use std::time::Duration;

use pingstat_common::config::{require_nonzero_duration, require_positive};
use pingstat_common::error::Result;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::{HopAccumulator, MtrReport};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::network::session::IcmpSession;
use crate::run_blocking;
use crate::tracer::{RouteTracer, run_trace};

impl RouteTracer {
    /// Runs `rounds` traces over one socket and summarises every hop number.
    ///
    /// The report is as long as the longest trace seen. Cancellation is
    /// honoured between rounds and between hops; a round cut short by it is
    /// discarded so every hop's `sent` stays within `rounds`.
    pub async fn mtr(
        &self,
        target: &ProbeTarget,
        rounds: u16,
        max_hops: u8,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<MtrReport> {
        let tracer = self.clone();
        let target = target.clone();
        let cancel = cancel.clone();
        run_blocking(move || tracer.mtr_blocking(&target, rounds, max_hops, timeout, &cancel)).await
    }

    pub fn mtr_blocking(
        &self,
        target: &ProbeTarget,
        rounds: u16,
        max_hops: u8,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<MtrReport> {
        let rounds = require_positive("rounds", rounds)?;
        let max_hops = require_positive("max hops", max_hops)?;
        let timeout = require_nonzero_duration("timeout", timeout)?;
        let destination = target.resolve()?;

        let mut session = IcmpSession::open(self.factory.as_ref(), self.identifier)?;
        let mut hops: Vec<HopAccumulator> = Vec::new();
        let mut completed: u16 = 0;

        info!("mtr to {target} ({destination}): {rounds} rounds, {max_hops} hops max");
        for round in 1..=rounds {
            if cancel.is_cancelled() {
                debug!("mtr to {target} cancelled before round {round}");
                break;
            }

            let trace = run_trace(&mut session, target, destination, max_hops, timeout, cancel)?;
            if !trace.reached && trace.hops.len() < usize::from(max_hops) {
                debug!("mtr to {target} cancelled during round {round}, dropping it");
                break;
            }
            for record in &trace.hops {
                let index = usize::from(record.hop - 1);
                while hops.len() <= index {
                    hops.push(HopAccumulator::new(hops.len() as u8 + 1));
                }
                hops[index].record(record);
            }
            completed += 1;
        }

        Ok(MtrReport {
            target: target.clone(),
            destination,
            rounds: completed,
            hops: hops.iter().map(HopAccumulator::summary).collect(),
        })
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
