mod commands;
mod terminal;

use commands::monitor::MonitorArgs;
use commands::{CommandLine, Commands, monitor, mtr, ping, trace};
use is_root::is_root;
use terminal::{logging, print};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose)?;

    if !is_root() {
        warn!("not running as root; raw ICMP sockets will likely be refused");
    }

    let cancel = cancel_on_ctrl_c();
    let json = commands.json;

    match commands.command {
        Commands::Ping { hosts, count, timeout } => {
            ping::ping(&hosts, count, timeout.duration(), json, &cancel).await
        }
        Commands::Trace { host, max_hops, timeout } => {
            trace::trace(&host, max_hops, timeout.duration(), json, &cancel).await
        }
        Commands::Mtr { host, rounds, max_hops, timeout } => {
            mtr::mtr(&host, rounds, max_hops, timeout.duration(), json, &cancel).await
        }
        Commands::Monitor { hosts, interval, cycles, defaults, count, timeout } => {
            if !json {
                print::header("starting monitor");
            }
            let args = MonitorArgs {
                hosts: hosts.as_deref(),
                interval: std::time::Duration::from_secs(interval),
                cycles,
                defaults,
                count,
                timeout: timeout.duration(),
                json,
            };
            monitor::monitor(args, &cancel).await
        }
    }
}

/// Token cancelled on the first Ctrl-C. In-flight probes still finish.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight probes");
            trigger.cancel();
        }
    });
    cancel
}
