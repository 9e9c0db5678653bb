//! Error taxonomy for the probing core.
//!
//! Per-host and per-hop failures are normally absorbed into data (loss
//! percentages, `*` hops). Only resource acquisition failures and invalid
//! parameters travel back to the caller as a [`ProbeError`].

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The target did not resolve to a usable IPv4 address.
    #[error("could not resolve '{target}' to an IPv4 address: {reason}")]
    ResolutionFailure { target: String, reason: String },

    /// Opening, configuring, writing to or reading from the raw socket failed.
    #[error("raw socket error while {context}: {source}{}", privilege_hint(.source))]
    Socket {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// No matching reply arrived before the deadline.
    #[error("no matching reply within {0:?}")]
    Timeout(std::time::Duration),

    /// Reply bytes were too short or otherwise not an ICMP message.
    #[error("malformed ICMP packet ({len} bytes): {reason}")]
    MalformedPacket { len: usize, reason: &'static str },

    /// Caller supplied parameters outside the valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A probe worker could not be joined.
    #[error("probe task failed: {0}")]
    TaskFailed(String),
}

impl ProbeError {
    pub fn socket(context: &'static str, source: io::Error) -> Self {
        Self::Socket { context, source }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Errors that are turned into data instead of being escalated.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailure { .. } | Self::Timeout(_) | Self::MalformedPacket { .. }
        )
    }
}

fn privilege_hint(source: &io::Error) -> &'static str {
    if source.kind() == io::ErrorKind::PermissionDenied {
        " (raw ICMP sockets require root or CAP_NET_RAW)"
    } else {
        ""
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
