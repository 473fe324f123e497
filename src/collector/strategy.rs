//! Bulk vs. incremental strategy selection.

use strum_macros::{AsRefStr, Display};

/// How a cycle gathers statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Strategy {
    /// One cluster-wide sweep fetching every bucket in a single call.
    Bulk,
    /// Targeted per-bucket fetches for stale buckets only.
    Incremental,
}

/// Pick the strategy for a cycle.
///
/// Bulk wins only when the stale count strictly exceeds the cutover: at the
/// boundary the incremental path is preferred, since N targeted fetches are
/// cheaper than one sweep of the whole population.
pub fn select_strategy(stale_count: usize, bulk_cutover: usize) -> Strategy {
    if stale_count > bulk_cutover {
        Strategy::Bulk
    } else {
        Strategy::Incremental
    }
}
