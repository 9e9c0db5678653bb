//! # ICMPv4 codec
//!
//! Encodes outbound Echo Requests and decodes whatever the raw socket hands
//! back. Inbound bytes start at the ICMP header; the IPv4 header of the
//! carrying datagram has already been stripped by the transport.
//!
//! Error messages (Time Exceeded, Destination Unreachable, Parameter Problem)
//! quote the offending datagram: its IPv4 header followed by at least the
//! first 8 bytes of our echo request. Those 8 bytes carry the identifier and
//! sequence used for correlation.

use std::net::Ipv4Addr;

use pingstat_common::error::{ProbeError, Result};
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::{EchoReplyPacket, MutableEchoReplyPacket};
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{self, Ipv4Packet, MutableIpv4Packet};
use tracing::trace;

/// Fixed payload marker of every echo request we send.
pub const PAYLOAD_MARKER: &[u8] = b"PINGSTATSMTR";

pub const ICMP_HDR_LEN: usize = 8;
const IPV4_HDR_LEN: usize = 20;

/// Identifier and sequence of an echo request quoted inside an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedEcho {
    pub identifier: u16,
    pub sequence: u16,
    /// Destination of the datagram that triggered the error.
    pub destination: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpMessage {
    EchoReply {
        identifier: u16,
        sequence: u16,
        /// Whether the payload still starts with [`PAYLOAD_MARKER`].
        marker_intact: bool,
    },
    TimeExceeded {
        code: u8,
        original: Option<QuotedEcho>,
    },
    /// Any other type. `original` is filled for error messages that quote
    /// an echo request.
    Other {
        icmp_type: u8,
        code: u8,
        original: Option<QuotedEcho>,
    },
}

impl IcmpMessage {
    /// True when this message answers the echo `(identifier, sequence)`.
    pub fn answers(&self, identifier: u16, sequence: u16) -> bool {
        match self {
            IcmpMessage::EchoReply { identifier: id, sequence: seq, .. } => {
                *id == identifier && *seq == sequence
            }
            IcmpMessage::TimeExceeded { original, .. } | IcmpMessage::Other { original, .. } => {
                original.is_some_and(|q| q.identifier == identifier && q.sequence == sequence)
            }
        }
    }
}

/// Builds an Echo Request carrying [`PAYLOAD_MARKER`], checksum included.
pub fn create_echo_request(identifier: u16, sequence: u16) -> Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_HDR_LEN + PAYLOAD_MARKER.len()];
    {
        let mut echo =
            MutableEchoRequestPacket::new(&mut buffer).ok_or(ProbeError::MalformedPacket {
                len: ICMP_HDR_LEN + PAYLOAD_MARKER.len(),
                reason: "buffer too small for echo request",
            })?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(PAYLOAD_MARKER);
    }
    set_checksum(&mut buffer);
    Ok(buffer)
}

/// Builds the Echo Reply a destination would return for our request.
pub fn create_echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_HDR_LEN + payload.len()];
    {
        let mut echo = MutableEchoReplyPacket::new(&mut buffer).ok_or(ProbeError::MalformedPacket {
            len: ICMP_HDR_LEN + payload.len(),
            reason: "buffer too small for echo reply",
        })?;
        echo.set_icmp_type(IcmpTypes::EchoReply);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(payload);
    }
    set_checksum(&mut buffer);
    Ok(buffer)
}

/// Builds an error message of `icmp_type` quoting `request` as sent from
/// `source` to `destination`, the way a router reports an expired TTL.
pub fn create_quoting_error(
    icmp_type: IcmpType,
    code: u8,
    source: Ipv4Addr,
    destination: Ipv4Addr,
    request: &[u8],
) -> Result<Vec<u8>> {
    let quoted_len = request.len().min(ICMP_HDR_LEN);
    let mut buffer: Vec<u8> = vec![0u8; ICMP_HDR_LEN + IPV4_HDR_LEN + quoted_len];
    buffer[0] = icmp_type.0;
    buffer[1] = code;

    {
        let mut ip = MutableIpv4Packet::new(&mut buffer[ICMP_HDR_LEN..ICMP_HDR_LEN + IPV4_HDR_LEN])
            .ok_or(ProbeError::MalformedPacket {
                len: IPV4_HDR_LEN,
                reason: "buffer too small for quoted IPv4 header",
            })?;
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((IPV4_HDR_LEN + request.len()) as u16);
        ip.set_ttl(1);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip.set_source(source);
        ip.set_destination(destination);
        let csum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(csum);
    }
    buffer[ICMP_HDR_LEN + IPV4_HDR_LEN..].copy_from_slice(&request[..quoted_len]);
    set_checksum(&mut buffer);
    Ok(buffer)
}

/// Decodes an inbound ICMP message.
///
/// Fails with [`ProbeError::MalformedPacket`] when the bytes cannot even
/// hold an ICMP header. Unknown types decode to [`IcmpMessage::Other`].
pub fn parse_message(bytes: &[u8]) -> Result<IcmpMessage> {
    if bytes.len() < ICMP_HDR_LEN {
        return Err(ProbeError::MalformedPacket {
            len: bytes.len(),
            reason: "shorter than an ICMP header",
        });
    }
    let packet = IcmpPacket::new(bytes).ok_or(ProbeError::MalformedPacket {
        len: bytes.len(),
        reason: "not an ICMP packet",
    })?;
    let icmp_type = packet.get_icmp_type();
    let code = packet.get_icmp_code().0;

    let message = match icmp_type {
        IcmpTypes::EchoReply => {
            let echo = EchoReplyPacket::new(bytes).ok_or(ProbeError::MalformedPacket {
                len: bytes.len(),
                reason: "truncated echo reply",
            })?;
            IcmpMessage::EchoReply {
                identifier: echo.get_identifier(),
                sequence: echo.get_sequence_number(),
                marker_intact: echo.payload().starts_with(PAYLOAD_MARKER),
            }
        }
        IcmpTypes::TimeExceeded => IcmpMessage::TimeExceeded {
            code,
            original: parse_quoted_echo(&bytes[ICMP_HDR_LEN..]),
        },
        IcmpTypes::DestinationUnreachable | IcmpTypes::ParameterProblem => IcmpMessage::Other {
            icmp_type: icmp_type.0,
            code,
            original: parse_quoted_echo(&bytes[ICMP_HDR_LEN..]),
        },
        other => {
            trace!("unhandled ICMP type {} code {code}", other.0);
            IcmpMessage::Other {
                icmp_type: other.0,
                code,
                original: None,
            }
        }
    };
    Ok(message)
}

fn parse_quoted_echo(quoted: &[u8]) -> Option<QuotedEcho> {
    let ip = Ipv4Packet::new(quoted)?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }
    let header_len = ip.get_header_length() as usize * 4;
    if header_len < IPV4_HDR_LEN {
        return None;
    }
    let echo = EchoRequestPacket::new(quoted.get(header_len..)?)?;
    if echo.get_icmp_type() != IcmpTypes::EchoRequest {
        return None;
    }
    Some(QuotedEcho {
        identifier: echo.get_identifier(),
        sequence: echo.get_sequence_number(),
        destination: ip.get_destination(),
    })
}

fn set_checksum(buffer: &mut [u8]) {
    buffer[2] = 0;
    buffer[3] = 0;
    let csum = match IcmpPacket::new(buffer) {
        Some(packet) => icmp::checksum(&packet),
        None => return,
    };
    buffer[2..4].copy_from_slice(&csum.to_be_bytes());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
