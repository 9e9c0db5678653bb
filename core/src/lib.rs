//! # Pingstat Core
//!
//! The probing engine. Data flows leaves first:
//!
//! * [`network`]: raw ICMP transport and the per-invocation echo session.
//! * [`prober`]: echo batches against one host, summarised as `HostStats`.
//! * [`tracer`] / [`mtr`]: hop-by-hop route discovery with increasing TTL.
//! * [`aggregator`]: the lock-guarded statistics map shared with presentation.
//! * [`scheduler`]: fan-out/fan-in collection cycles over many hosts.
//! * [`discovery`]: the default host list used when the caller has none.

pub mod aggregator;
pub mod discovery;
pub mod mtr;
pub mod network;
pub mod prober;
pub mod scheduler;
pub mod tracer;

use pingstat_common::error::{ProbeError, Result};

/// Runs blocking socket work on the blocking pool and waits for it.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProbeError::TaskFailed(e.to_string()))?
}
