//! # Probe Target Model
//!
//! A [`ProbeTarget`] is the identity of a host as the user typed it: either a
//! literal IPv4 address or a hostname. Hostnames are resolved once per probe,
//! never cached across cycles, so a DNS change is picked up on the next cycle.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProbeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeTarget {
    host: String,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Resolves the target to the first IPv4 address it maps to.
    ///
    /// Literal IPv4 addresses are returned without a lookup. Literal IPv6
    /// addresses and names that only carry AAAA records fail with
    /// [`ProbeError::ResolutionFailure`].
    pub fn resolve(&self) -> Result<Ipv4Addr> {
        if let Ok(addr) = self.host.parse::<Ipv4Addr>() {
            return Ok(addr);
        }
        if self.host.parse::<IpAddr>().is_ok() {
            return Err(self.resolution_failure("IPv6 targets are not supported"));
        }

        let addrs = (self.host.as_str(), 0)
            .to_socket_addrs()
            .map_err(|e| self.resolution_failure(e.to_string()))?;

        let resolved = addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| self.resolution_failure("no IPv4 address found"))?;

        debug!("resolved {} to {resolved}", self.host);
        Ok(resolved)
    }

    fn resolution_failure(&self, reason: impl Into<String>) -> ProbeError {
        ProbeError::ResolutionFailure {
            target: self.host.clone(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

impl From<Ipv4Addr> for ProbeTarget {
    fn from(addr: Ipv4Addr) -> Self {
        Self::new(addr.to_string())
    }
}

impl FromStr for ProbeTarget {
    type Err = String;

    /// Accepts a literal address or a hostname. Whitespace is trimmed;
    /// empty input and embedded whitespace are rejected.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("target cannot be empty".to_string());
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(format!("invalid target: {trimmed}"));
        }
        Ok(Self::new(trimmed))
    }
}

/// Parses a comma-separated host list (e.g. "8.8.8.8, example.com").
///
/// Empty entries are skipped, duplicates keep their first position.
pub fn parse_host_list(s: &str) -> std::result::Result<Vec<ProbeTarget>, String> {
    let mut targets: Vec<ProbeTarget> = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let target = ProbeTarget::from_str(part)
            .map_err(|e| format!("failed to parse target '{part}': {e}"))?;

        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    Ok(targets)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
