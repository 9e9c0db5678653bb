//! One echo exchange loop over an exclusively owned [`IcmpChannel`].
//!
//! A raw ICMP socket sees every ICMP message the host receives, including
//! replies to other probes of this process. Correlation therefore happens
//! here: a caller-supplied predicate decides which message answers the
//! outstanding request, everything else is discarded until the deadline.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use pingstat_common::error::{ProbeError, Result};
use pingstat_protocols::icmp::{self, IcmpMessage};
use tracing::{debug, trace};

use super::transport::{ChannelFactory, IcmpChannel};

static NEXT_SEQUENCE: AtomicU16 = AtomicU16::new(1);

/// ICMP identifier shared by every probe of this process.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Next sequence number from the process wide counter. Wraps at `u16::MAX`.
pub fn next_sequence() -> u16 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Awaited {
    Matched {
        message: IcmpMessage,
        source: Ipv4Addr,
        rtt: Duration,
    },
    /// Deadline passed. `malformed` holds the arrival time of the first
    /// unparseable packet, if any arrived.
    Unanswered { malformed: Option<Duration> },
}

pub struct IcmpSession {
    channel: Box<dyn IcmpChannel>,
    identifier: u16,
}

impl IcmpSession {
    pub fn open(factory: &dyn ChannelFactory, identifier: u16) -> Result<Self> {
        Ok(Self {
            channel: factory.open()?,
            identifier,
        })
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn set_ttl(&mut self, ttl: u8) -> Result<()> {
        self.channel
            .set_ttl(ttl)
            .map_err(|e| ProbeError::socket("setting TTL", e))
    }

    /// Sends an echo request and returns the send timestamp.
    pub fn send_echo(&mut self, destination: Ipv4Addr, sequence: u16) -> Result<Instant> {
        let packet = icmp::create_echo_request(self.identifier, sequence)?;
        let sent_at = Instant::now();
        self.channel
            .send_to(&packet, destination)
            .map_err(|e| ProbeError::socket("sending echo request", e))?;
        trace!("sent echo id={} seq={sequence} to {destination}", self.identifier);
        Ok(sent_at)
    }

    /// Reads until `accept` matches a message or `timeout` after `sent_at`.
    pub fn await_reply<F>(
        &mut self,
        sent_at: Instant,
        timeout: Duration,
        accept: F,
    ) -> Result<Awaited>
    where
        F: Fn(&IcmpMessage, Ipv4Addr) -> bool,
    {
        let deadline = sent_at + timeout;
        let mut malformed: Option<Duration> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Awaited::Unanswered { malformed });
            }

            let received = self
                .channel
                .recv_timeout(remaining)
                .map_err(|e| ProbeError::socket("receiving ICMP reply", e))?;

            let Some((bytes, source)) = received else {
                return Ok(Awaited::Unanswered { malformed });
            };

            match icmp::parse_message(&bytes) {
                Ok(message) if accept(&message, source) => {
                    return Ok(Awaited::Matched {
                        message,
                        source,
                        rtt: sent_at.elapsed(),
                    });
                }
                Ok(message) => {
                    trace!("discarding unrelated {message:?} from {source}");
                }
                Err(e) => {
                    debug!("ignoring packet from {source}: {e}");
                    malformed.get_or_insert_with(|| sent_at.elapsed());
                }
            }
        }
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
