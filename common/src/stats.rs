//! # Probe Result Model
//!
//! Types flowing out of the probing core towards presentation layers:
//!
//! * [`EchoAttempt`] - one outbound echo and how it resolved.
//! * [`HostStats`] - latency/loss summary of one host for one cycle.
//! * [`HopRecord`] / [`RouteTrace`] - the outcome of a hop-by-hop trace.
//! * [`HopSummary`] / [`MtrReport`] - per-hop statistics over repeated traces.
//!
//! All RTT values leave this module as milliseconds in `f64`; loss is a
//! percentage rounded to one decimal.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::network::target::ProbeTarget;

/// Address shown for a hop that never answered.
pub const NO_REPLY_ADDR: &str = "*";
/// Address shown for a hop that answered with something we could not use.
pub const UNKNOWN_REPLY_ADDR: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResolution {
    /// A matching reply arrived after `rtt`.
    Reply { rtt: Duration },
    /// Nothing matching arrived before the deadline.
    Timeout,
    /// Only unparseable packets arrived before the deadline.
    Malformed,
}

/// One echo request of a probe batch.
#[derive(Debug, Clone, Copy)]
pub struct EchoAttempt {
    pub identifier: u16,
    pub sequence: u16,
    pub sent_at: Instant,
    pub resolution: AttemptResolution,
}

impl EchoAttempt {
    pub fn rtt(&self) -> Option<Duration> {
        match self.resolution {
            AttemptResolution::Reply { rtt } => Some(rtt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStats {
    pub host: ProbeTarget,
    pub address: Option<Ipv4Addr>,
    #[serde(rename = "minRTT")]
    pub min_rtt_ms: f64,
    #[serde(rename = "avgRTT")]
    pub avg_rtt_ms: f64,
    #[serde(rename = "maxRTT")]
    pub max_rtt_ms: f64,
    #[serde(rename = "packetLossPercent")]
    pub packet_loss: f64,
    pub sent: u16,
    pub received: u16,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
}

impl HostStats {
    /// Summarises a batch of attempts.
    ///
    /// RTT aggregates only cover attempts with a matching reply. When none
    /// succeeded, loss is 100 and every RTT field is zero.
    pub fn from_attempts(host: ProbeTarget, address: Ipv4Addr, attempts: &[EchoAttempt]) -> Self {
        let rtts: Vec<Duration> = attempts.iter().filter_map(EchoAttempt::rtt).collect();
        let sent = attempts.len() as u16;
        let received = rtts.len() as u16;
        let summary = RttSummary::from_durations(&rtts);

        Self {
            host,
            address: Some(address),
            min_rtt_ms: summary.min_ms,
            avg_rtt_ms: summary.avg_ms,
            max_rtt_ms: summary.max_ms,
            packet_loss: loss_percent(sent as u32, received as u32),
            sent,
            received,
            last_update: Utc::now(),
        }
    }

    /// Synthetic result for a host that could not be probed at all.
    pub fn unreachable(host: ProbeTarget, address: Option<Ipv4Addr>) -> Self {
        Self {
            host,
            address,
            min_rtt_ms: 0.0,
            avg_rtt_ms: 0.0,
            max_rtt_ms: 0.0,
            packet_loss: 100.0,
            sent: 0,
            received: 0,
            last_update: Utc::now(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.packet_loss < 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopRecord {
    pub hop: u8,
    pub address: String,
    #[serde(rename = "rttMs")]
    pub rtt_ms: f64,
    pub success: bool,
}

impl HopRecord {
    pub fn replied(hop: u8, address: Ipv4Addr, rtt: Duration) -> Self {
        Self {
            hop,
            address: address.to_string(),
            rtt_ms: duration_ms(rtt),
            success: true,
        }
    }

    pub fn no_reply(hop: u8) -> Self {
        Self {
            hop,
            address: NO_REPLY_ADDR.to_string(),
            rtt_ms: 0.0,
            success: false,
        }
    }

    /// A reply of an unexpected type, or a malformed packet.
    pub fn unexpected(hop: u8, rtt: Duration) -> Self {
        Self {
            hop,
            address: UNKNOWN_REPLY_ADDR.to_string(),
            rtt_ms: duration_ms(rtt),
            success: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTrace {
    pub target: ProbeTarget,
    pub destination: Ipv4Addr,
    pub hops: Vec<HopRecord>,
    /// True when the last hop is the destination's echo reply.
    pub reached: bool,
}

impl RouteTrace {
    pub fn new(target: ProbeTarget, destination: Ipv4Addr) -> Self {
        Self {
            target,
            destination,
            hops: Vec::new(),
            reached: false,
        }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn last(&self) -> Option<&HopRecord> {
        self.hops.last()
    }
}

/// Statistics for one hop number across several traces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopSummary {
    pub hop: u8,
    /// Responding addresses, most recent first.
    pub addresses: Vec<Ipv4Addr>,
    pub sent: u32,
    pub received: u32,
    #[serde(rename = "lossPercent")]
    pub loss_percent: f64,
    #[serde(rename = "minRTT")]
    pub min_rtt_ms: f64,
    #[serde(rename = "avgRTT")]
    pub avg_rtt_ms: f64,
    #[serde(rename = "maxRTT")]
    pub max_rtt_ms: f64,
    #[serde(rename = "lastRTT")]
    pub last_rtt_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MtrReport {
    pub target: ProbeTarget,
    pub destination: Ipv4Addr,
    pub rounds: u16,
    pub hops: Vec<HopSummary>,
}

/// Accumulates hop records of repeated traces into [`HopSummary`] rows.
#[derive(Debug, Default, Clone)]
pub struct HopAccumulator {
    hop: u8,
    addresses: Vec<Ipv4Addr>,
    sent: u32,
    rtts: Vec<f64>,
    last_rtt_ms: f64,
}

impl HopAccumulator {
    pub fn new(hop: u8) -> Self {
        Self { hop, ..Default::default() }
    }

    pub fn record(&mut self, record: &HopRecord) {
        self.sent += 1;
        if !record.success {
            return;
        }
        self.rtts.push(record.rtt_ms);
        self.last_rtt_ms = record.rtt_ms;
        if let Ok(addr) = record.address.parse::<Ipv4Addr>() {
            self.addresses.retain(|known| *known != addr);
            self.addresses.insert(0, addr);
        }
    }

    pub fn summary(&self) -> HopSummary {
        let received = self.rtts.len() as u32;
        let (min_rtt_ms, avg_rtt_ms, max_rtt_ms) = if self.rtts.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = self.rtts.iter().copied().fold(f64::INFINITY, f64::min);
            let max = self.rtts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = self.rtts.iter().sum::<f64>() / self.rtts.len() as f64;
            (min, avg, max)
        };

        HopSummary {
            hop: self.hop,
            addresses: self.addresses.clone(),
            sent: self.sent,
            received,
            loss_percent: loss_percent(self.sent, received),
            min_rtt_ms,
            avg_rtt_ms,
            max_rtt_ms,
            last_rtt_ms: self.last_rtt_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RttSummary {
    min_ms: f64,
    avg_ms: f64,
    max_ms: f64,
}

impl RttSummary {
    fn from_durations(rtts: &[Duration]) -> Self {
        let (Some(min), Some(max)) = (rtts.iter().min(), rtts.iter().max()) else {
            return Self::default();
        };
        let total: Duration = rtts.iter().sum();
        Self {
            min_ms: duration_ms(*min),
            avg_ms: duration_ms(total) / rtts.len() as f64,
            max_ms: duration_ms(*max),
        }
    }
}

/// `(sent - received) / sent * 100`, rounded to one decimal. Zero sent
/// counts as total loss.
pub fn loss_percent(sent: u32, received: u32) -> f64 {
    if sent == 0 {
        return 100.0;
    }
    let lost = sent.saturating_sub(received) as f64;
    round_one_decimal(lost * 100.0 / sent as f64)
}

pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
