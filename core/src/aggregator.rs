//! # Statistics Aggregator
//!
//! The only shared mutable state of the core: a map from target to its most
//! recent [`HostStats`], behind a read/write lock. Writers replace whole
//! entries; readers take a [`StatsSnapshot`] copy and never hold the lock
//! while presenting.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use pingstat_common::network::target::ProbeTarget;
use pingstat_common::stats::HostStats;
use tracing::trace;

/// Immutable copy of all entries, ordered by target for stable output.
pub type StatsSnapshot = BTreeMap<ProbeTarget, HostStats>;

#[derive(Debug, Default)]
pub struct StatsAggregator {
    entries: RwLock<HashMap<ProbeTarget, HostStats>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry of `host` in one step.
    pub fn update(&self, host: ProbeTarget, stats: HostStats) {
        trace!("updating stats for {host}");
        self.entries.write().insert(host, stats);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let entries = self.entries.read();
        entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn get(&self, host: &ProbeTarget) -> Option<HostStats> {
        self.entries.read().get(host).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
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
