//! # Route Tracer
//!
//! Discovers the path to a destination by sending one echo request per TTL,
//! starting at 1. Routers that drop the packet answer with Time Exceeded;
//! the destination answers with an Echo Reply, which ends the trace.
//!
//! Per-hop silence is data (`*`), not an error. Resolution and socket
//! failures abort the trace without a partial result.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pingstat_common::config::{require_nonzero_duration, require_positive};
use pingstat_common::error::Result;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::{HopRecord, RouteTrace};
use pingstat_protocols::icmp::IcmpMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::network::session::{Awaited, IcmpSession, next_sequence, process_identifier};
use crate::network::transport::ChannelFactory;
use crate::run_blocking;

#[derive(Clone)]
pub struct RouteTracer {
    pub(crate) factory: Arc<dyn ChannelFactory>,
    pub(crate) identifier: u16,
}

impl RouteTracer {
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self::with_identifier(factory, process_identifier())
    }

    pub fn with_identifier(factory: Arc<dyn ChannelFactory>, identifier: u16) -> Self {
        Self { factory, identifier }
    }

    pub async fn trace(
        &self,
        target: &ProbeTarget,
        max_hops: u8,
        timeout: Duration,
    ) -> Result<RouteTrace> {
        self.trace_until(target, max_hops, timeout, &CancellationToken::new()).await
    }

    /// Like [`RouteTracer::trace`], but stops between hops once `cancel` fires
    /// and returns the hops collected so far.
    pub async fn trace_until(
        &self,
        target: &ProbeTarget,
        max_hops: u8,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RouteTrace> {
        let tracer = self.clone();
        let target = target.clone();
        let cancel = cancel.clone();
        run_blocking(move || tracer.trace_blocking(&target, max_hops, timeout, &cancel)).await
    }

    pub fn trace_blocking(
        &self,
        target: &ProbeTarget,
        max_hops: u8,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RouteTrace> {
        let max_hops = require_positive("max hops", max_hops)?;
        let timeout = require_nonzero_duration("timeout", timeout)?;
        let destination = target.resolve()?;

        let mut session = IcmpSession::open(self.factory.as_ref(), self.identifier)?;
        info!("tracing route to {target} ({destination}), {max_hops} hops max");
        let trace = run_trace(&mut session, target, destination, max_hops, timeout, cancel)?;

        info!(
            "trace to {target} finished after {} hops, destination {}",
            trace.len(),
            if trace.reached { "reached" } else { "not reached" }
        );
        Ok(trace)
    }
}

/// Walks TTL 1..=max_hops over an already open session.
pub(crate) fn run_trace(
    session: &mut IcmpSession,
    target: &ProbeTarget,
    destination: Ipv4Addr,
    max_hops: u8,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<RouteTrace> {
    let mut trace = RouteTrace::new(target.clone(), destination);

    for ttl in 1..=max_hops {
        if cancel.is_cancelled() {
            debug!("trace to {destination} cancelled before hop {ttl}");
            break;
        }

        let record = probe_hop(session, destination, ttl, timeout)?;
        let reached = record.success && record.address == destination.to_string();
        debug!("hop {ttl}: {} {:.3}ms", record.address, record.rtt_ms);
        trace.hops.push(record);

        if reached {
            trace.reached = true;
            break;
        }
    }

    Ok(trace)
}

fn probe_hop(
    session: &mut IcmpSession,
    destination: Ipv4Addr,
    ttl: u8,
    timeout: Duration,
) -> Result<HopRecord> {
    let identifier = session.identifier();
    let sequence = next_sequence();

    session.set_ttl(ttl)?;
    let sent_at = session.send_echo(destination, sequence)?;

    let awaited = session.await_reply(sent_at, timeout, |message, source| {
        if !message.answers(identifier, sequence) {
            return false;
        }
        match message {
            IcmpMessage::EchoReply { .. } => source == destination,
            IcmpMessage::TimeExceeded { .. } | IcmpMessage::Other { .. } => true,
        }
    })?;

    let record = match awaited {
        Awaited::Matched {
            message: IcmpMessage::EchoReply { .. } | IcmpMessage::TimeExceeded { .. },
            source,
            rtt,
        } => HopRecord::replied(ttl, source, rtt),
        Awaited::Matched { message, source, rtt } => {
            debug!("hop {ttl}: unexpected {message:?} from {source}");
            HopRecord::unexpected(ttl, rtt)
        }
        Awaited::Unanswered { malformed: Some(rtt) } => HopRecord::unexpected(ttl, rtt),
        Awaited::Unanswered { malformed: None } => HopRecord::no_reply(ttl),
    };
    Ok(record)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
