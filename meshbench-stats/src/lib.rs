#![warn(missing_docs)]
//! MeshBench Distributed Statistics
//!
//! Computes summary statistics (min, max, average) over a dataset that
//! is scattered across a process group:
//! - Partition validation before any communication
//! - Equal-shard scatter in rank order from the root
//! - Local fold per rank, then MIN/MAX/SUM reductions onto the root
//! - Optional gather-based reassembly verification
//! - Seeded dataset generation for reproducible runs

pub mod dataset;
mod pipeline;
mod summary;

pub use pipeline::{PipelineError, ROOT, StatsOptions, partitionable, run};
pub use summary::{GlobalSummary, ShardSummary};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_rank() {
        assert_eq!(ROOT, 0);
    }

    #[test]
    fn test_dataset_bounds() {
        assert_eq!(dataset::VALUE_LOW, 0.0);
        assert_eq!(dataset::VALUE_HIGH, 100.0);
    }
}
