pub mod monitor;
pub mod mtr;
pub mod ping;
pub mod trace;

use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use pingstat_common::config::{DEFAULT_ATTEMPTS, DEFAULT_MAX_HOPS, DEFAULT_MTR_ROUNDS};
use pingstat_common::network::target::ProbeTarget;

#[derive(Parser)]
#[command(name = "pingstat")]
#[command(version, about = "ICMP reachability, latency and route diagnostics.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe one or more hosts once
    #[command(alias = "p")]
    Ping {
        /// Comma separated hosts, e.g. "8.8.8.8,example.com"
        hosts: String,
        /// Echo requests per host
        #[arg(short = 'c', long = "count", default_value_t = DEFAULT_ATTEMPTS)]
        count: u16,
        #[command(flatten)]
        timeout: TimeoutArg,
    },
    /// Trace the route to a host
    #[command(alias = "t")]
    Trace {
        host: ProbeTarget,
        #[arg(long, default_value_t = DEFAULT_MAX_HOPS)]
        max_hops: u8,
        #[command(flatten)]
        timeout: TimeoutArg,
    },
    /// Repeat traces and show per-hop statistics
    #[command(alias = "m")]
    Mtr {
        host: ProbeTarget,
        #[arg(long, default_value_t = DEFAULT_MTR_ROUNDS)]
        rounds: u16,
        #[arg(long, default_value_t = DEFAULT_MAX_HOPS)]
        max_hops: u8,
        #[command(flatten)]
        timeout: TimeoutArg,
    },
    /// Probe hosts periodically until interrupted
    Monitor {
        /// Comma separated hosts
        hosts: Option<String>,
        /// Seconds between cycles
        #[arg(long, default_value_t = 10)]
        interval: u64,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Prepend this device, the first hops and public resolvers
        #[arg(long)]
        defaults: bool,
        #[arg(short = 'c', long = "count", default_value_t = DEFAULT_ATTEMPTS)]
        count: u16,
        #[command(flatten)]
        timeout: TimeoutArg,
    },
}

#[derive(clap::Args, Clone, Copy)]
pub struct TimeoutArg {
    /// Per attempt (or per hop) timeout in milliseconds
    #[arg(short = 't', long = "timeout-ms", default_value_t = 1000)]
    pub timeout_ms: u64,
}

impl TimeoutArg {
    pub fn duration(self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
