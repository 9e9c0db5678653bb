//! Raw ICMP transport.
//!
//! [`IcmpChannel`] is the only seam between protocol logic and the operating
//! system. Each channel is one raw socket owned by exactly one probe or trace
//! invocation; dropping the channel closes the socket.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pingstat_common::error::{ProbeError, Result};
use pnet::{
    packet::{Packet, icmp::IcmpPacket, ip::IpNextHeaderProtocols},
    transport::{
        self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
    },
};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

pub trait IcmpChannel: Send {
    /// Sets the IP TTL used for every following send.
    fn set_ttl(&mut self, ttl: u8) -> io::Result<()>;

    /// Sends one ICMP message (header included) to `destination`.
    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()>;

    /// Waits up to `timeout` for the next inbound ICMP message.
    ///
    /// Returns the ICMP bytes (without IPv4 header) and the sender address,
    /// or `None` once `timeout` elapsed without traffic.
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, Ipv4Addr)>>;
}

pub trait ChannelFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn IcmpChannel>>;
}

/// Opens Layer 4 ICMP sockets through `pnet`. Needs root or `CAP_NET_RAW`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketFactory;

impl ChannelFactory for RawSocketFactory {
    fn open(&self) -> Result<Box<dyn IcmpChannel>> {
        let (tx, rx) =
            open_channel().map_err(|e| ProbeError::socket("opening raw ICMP channel", e))?;
        Ok(Box::new(RawIcmpChannel { tx, rx }))
    }
}

/// The transport used outside of tests.
pub fn default_factory() -> Arc<dyn ChannelFactory> {
    Arc::new(RawSocketFactory)
}

pub struct RawIcmpChannel {
    tx: TransportSender,
    rx: TransportReceiver,
}

impl IcmpChannel for RawIcmpChannel {
    fn set_ttl(&mut self, ttl: u8) -> io::Result<()> {
        self.tx.set_ttl(ttl)
    }

    fn send_to(&mut self, packet: &[u8], destination: Ipv4Addr) -> io::Result<()> {
        let icmp = IcmpPacket::new(packet).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "packet shorter than ICMP header")
        })?;
        self.tx.send_to(icmp, IpAddr::V4(destination)).map(|_| ())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<Option<(Vec<u8>, Ipv4Addr)>> {
        let deadline = Instant::now() + timeout;
        let mut iter = transport::icmp_packet_iter(&mut self.rx);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match iter.next_with_timeout(remaining)? {
                Some((packet, IpAddr::V4(source))) => {
                    return Ok(Some((packet.packet().to_vec(), source)));
                }
                Some((_, IpAddr::V6(_))) => continue,
                None => return Ok(None),
            }
        }
    }
}

fn open_channel() -> io::Result<(TransportSender, TransportReceiver)> {
    transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
