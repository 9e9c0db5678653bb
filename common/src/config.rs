//! Configuration surface consumed from the caller.
//!
//! The `validate` methods enforce the user-facing bounds. The probing core
//! trusts those bounds but still rejects zero values on its own through
//! [`require_positive`] and friends.

use std::time::Duration;

use crate::error::{ProbeError, Result};
use crate::network::target::ProbeTarget;

pub const DEFAULT_ATTEMPTS: u16 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_HOPS: u8 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MTR_ROUNDS: u16 = 10;

pub const MIN_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);
pub const MAX_HOPS_LIMIT: u8 = 30;
pub const MAX_ATTEMPTS: u16 = 100;
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Echo requests sent per host per cycle.
    pub attempts: u16,
    /// How long each attempt waits for its matching reply.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 || self.attempts > MAX_ATTEMPTS {
            return Err(ProbeError::invalid_config(format!(
                "attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
                self.attempts
            )));
        }
        validate_timeout(self.timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    pub max_hops: u8,
    /// How long each hop waits for a reply.
    pub timeout: Duration,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TraceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 || self.max_hops > MAX_HOPS_LIMIT {
            return Err(ProbeError::invalid_config(format!(
                "max hops must be between 1 and {MAX_HOPS_LIMIT}, got {}",
                self.max_hops
            )));
        }
        validate_timeout(self.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub hosts: Vec<ProbeTarget>,
    /// Delay between the start of two collection cycles.
    pub interval: Duration,
    pub probe: ProbeConfig,
    /// Stop after this many cycles. `None` runs until cancelled.
    pub max_cycles: Option<u64>,
}

impl MonitorConfig {
    pub fn new(hosts: Vec<ProbeTarget>) -> Self {
        Self {
            hosts,
            interval: DEFAULT_INTERVAL,
            probe: ProbeConfig::default(),
            max_cycles: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval < MIN_INTERVAL || self.interval > MAX_INTERVAL {
            return Err(ProbeError::invalid_config(format!(
                "interval must be between {}s and {}s, got {}s",
                MIN_INTERVAL.as_secs(),
                MAX_INTERVAL.as_secs(),
                self.interval.as_secs_f64()
            )));
        }
        if self.max_cycles == Some(0) {
            return Err(ProbeError::invalid_config("cycle limit must be positive"));
        }
        self.probe.validate()
    }
}

fn validate_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() || timeout > MAX_TIMEOUT {
        return Err(ProbeError::invalid_config(format!(
            "timeout must be between 1ms and {}s, got {timeout:?}",
            MAX_TIMEOUT.as_secs()
        )));
    }
    Ok(())
}

/// Fails fast on a zero count, used by the core on its own entry points.
pub fn require_positive<T>(name: &str, value: T) -> Result<T>
where
    T: Copy + PartialEq + Default + std::fmt::Display,
{
    if value == T::default() {
        return Err(ProbeError::invalid_config(format!("{name} must be positive, got {value}")));
    }
    Ok(value)
}

pub fn require_nonzero_duration(name: &str, value: Duration) -> Result<Duration> {
    if value.is_zero() {
        return Err(ProbeError::invalid_config(format!("{name} must be non-zero")));
    }
    Ok(value)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
