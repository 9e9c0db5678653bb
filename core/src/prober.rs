//! # Echo Prober
//!
//! Sends a batch of sequential echo requests to one host and condenses the
//! outcome into [`HostStats`]. Each attempt waits for its own reply before the
//! next one leaves, so attempts are scored in sequence order.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pingstat_common::config::{require_nonzero_duration, require_positive};
use pingstat_common::error::{ProbeError, Result};
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::{AttemptResolution, EchoAttempt, HostStats};
use pingstat_protocols::icmp::IcmpMessage;
use tracing::{debug, warn};

use crate::network::session::{Awaited, IcmpSession, next_sequence, process_identifier};
use crate::network::transport::ChannelFactory;
use crate::run_blocking;
use crate::scheduler::HostProbe;

#[derive(Clone)]
pub struct Prober {
    factory: Arc<dyn ChannelFactory>,
    identifier: u16,
}

impl Prober {
    pub fn new(factory: Arc<dyn ChannelFactory>) -> Self {
        Self::with_identifier(factory, process_identifier())
    }

    pub fn with_identifier(factory: Arc<dyn ChannelFactory>, identifier: u16) -> Self {
        Self { factory, identifier }
    }

    /// Probes `target` with `attempts` echo requests. Blocks the caller.
    ///
    /// A target that does not resolve is not an error: it yields a 100% loss
    /// result so sibling probes of the same cycle are unaffected. Socket
    /// failures abort the batch and are returned.
    pub fn probe(
        &self,
        target: &ProbeTarget,
        attempts: u16,
        timeout: Duration,
    ) -> Result<HostStats> {
        let attempts = require_positive("attempts", attempts)?;
        let timeout = require_nonzero_duration("timeout", timeout)?;

        let address = match target.resolve() {
            Ok(address) => address,
            Err(e) => {
                warn!("{e}");
                return Ok(HostStats::unreachable(target.clone(), None));
            }
        };

        let mut session = IcmpSession::open(self.factory.as_ref(), self.identifier)?;
        let mut batch = Vec::with_capacity(attempts as usize);
        for _ in 0..attempts {
            batch.push(self.attempt(&mut session, address, timeout)?);
        }

        let stats = HostStats::from_attempts(target.clone(), address, &batch);
        debug!(
            "{target} ({address}): {}/{} replies, loss {}%",
            stats.received, stats.sent, stats.packet_loss
        );
        Ok(stats)
    }

    fn attempt(
        &self,
        session: &mut IcmpSession,
        address: Ipv4Addr,
        timeout: Duration,
    ) -> Result<EchoAttempt> {
        let identifier = session.identifier();
        let sequence = next_sequence();
        let sent_at = session.send_echo(address, sequence)?;

        let awaited = session.await_reply(sent_at, timeout, |message, source| {
            source == address
                && matches!(message, IcmpMessage::EchoReply { .. })
                && message.answers(identifier, sequence)
        })?;

        let resolution = match awaited {
            Awaited::Matched { message, rtt, .. } => {
                if let IcmpMessage::EchoReply { marker_intact: false, .. } = message {
                    debug!("echo reply seq={sequence} from {address} lost its payload marker");
                }
                AttemptResolution::Reply { rtt }
            }
            Awaited::Unanswered { malformed: Some(_) } => {
                debug!("seq={sequence} to {address}: only malformed packets before deadline");
                AttemptResolution::Malformed
            }
            Awaited::Unanswered { malformed: None } => {
                debug!("seq={sequence} to {address}: {}", ProbeError::Timeout(timeout));
                AttemptResolution::Timeout
            }
        };

        Ok(EchoAttempt {
            identifier,
            sequence,
            sent_at,
            resolution,
        })
    }
}

#[async_trait]
impl HostProbe for Prober {
    async fn probe(
        &self,
        target: ProbeTarget,
        attempts: u16,
        timeout: Duration,
    ) -> Result<HostStats> {
        let prober = self.clone();
        run_blocking(move || Prober::probe(&prober, &target, attempts, timeout)).await
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
