//! Shard and Global Summaries
//!
//! A shard summary is one rank's single-pass reduction over its local
//! shard; a global summary exists only on the root after the group-wide
//! reductions. Both carry their element counts so averages stay derivable
//! and the empty case stays explicit.

use meshbench_group::ReduceOp;
use serde::Serialize;

/// Per-rank statistics over one local shard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShardSummary {
    /// Smallest element; +∞ for an empty shard.
    pub min: f64,
    /// Largest element; −∞ for an empty shard.
    pub max: f64,
    /// Sum of the elements.
    pub sum: f64,
    /// Element count.
    pub count: u64,
}

impl ShardSummary {
    /// Compute min, max, sum, and count over a shard in one pass.
    ///
    /// The accumulators start at the reduction identities, so an empty
    /// shard folds away in the group-wide reductions.
    pub fn from_slice(shard: &[f64]) -> Self {
        let mut min = ReduceOp::Min.identity();
        let mut max = ReduceOp::Max.identity();
        let mut sum = ReduceOp::Sum.identity();
        for &value in shard {
            min = ReduceOp::Min.apply(min, value);
            max = ReduceOp::Max.apply(max, value);
            sum = ReduceOp::Sum.apply(sum, value);
        }
        Self {
            min,
            max,
            sum,
            count: shard.len() as u64,
        }
    }

    /// Local average; 0 for an empty shard.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Group-wide statistics, produced on the root rank only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalSummary {
    /// Total element count across the group.
    pub count: u64,
    /// Global minimum.
    pub min: f64,
    /// Global maximum.
    pub max: f64,
    /// Global average; defined as 0 when the dataset is empty.
    pub avg: f64,
}
