//! Distributed Statistics Pipeline
//!
//! The full collective sequence for one run: validate the partition
//! precondition, broadcast the element count, scatter the dataset into
//! equal shards, reduce the local summaries with MIN/MAX/SUM onto the
//! root, derive the guarded average, and optionally gather the shards
//! back for a reassembly check.
//!
//! Every rank must call [`run`] with the same `count` and options; the
//! partition predicate is evaluated by each member independently from
//! those shared inputs, so a violation makes the whole group fail
//! without any cross-rank abort signal.

use meshbench_group::{GroupContext, GroupError, ReduceOp};
use thiserror::Error;

use crate::summary::{GlobalSummary, ShardSummary};

/// Root rank: owns the dataset before distribution and the global
/// summary after aggregation.
pub const ROOT: u32 = 0;

/// Errors from a statistics run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The element count is not a multiple of the group size.
    #[error("{count} elements cannot be split evenly across {size} ranks")]
    NotPartitionable {
        /// Total element count.
        count: u64,
        /// Group size.
        size: u32,
    },

    /// Dataset at the root does not match the announced element count.
    #[error("dataset length {len} does not match element count {count}")]
    DatasetLength {
        /// Actual dataset length.
        len: usize,
        /// Announced element count.
        count: u64,
    },

    /// The gathered shards do not reassemble into the original dataset.
    #[error("reassembled dataset does not match the original")]
    VerifyMismatch,

    /// Group communication failure.
    #[error("group operation failed: {0}")]
    Group(#[from] GroupError),
}

/// True when `count` elements divide evenly across `size` ranks.
pub fn partitionable(count: u64, size: u32) -> bool {
    size > 0 && count % size as u64 == 0
}

/// Options for a statistics run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsOptions {
    /// Gather the shards back onto the root and compare against the
    /// original dataset after the reductions.
    pub verify: bool,
}

/// Run the distributed statistics pipeline.
///
/// The root passes `Some(dataset)` with exactly `count` elements; every
/// other rank passes `None`. Returns `Some(summary)` on the root and
/// `None` elsewhere.
pub fn run(
    group: &mut GroupContext,
    count: u64,
    dataset: Option<&[f64]>,
    options: &StatsOptions,
) -> Result<Option<GlobalSummary>, PipelineError> {
    let rank = group.rank();
    let size = group.size();

    // Checked before any communication, on every rank.
    if !partitionable(count, size) {
        return Err(PipelineError::NotPartitionable { count, size });
    }
    if rank == ROOT {
        if let Some(data) = dataset {
            if data.len() as u64 != count {
                return Err(PipelineError::DatasetLength {
                    len: data.len(),
                    count,
                });
            }
        }
    }

    // Defensive synchronization: non-root ranks adopt the root's count
    // even though every member was launched with the same argument.
    let count = group.broadcast_count(count, ROOT)?;

    let shard = group.scatter(dataset, ROOT)?;

    let local = ShardSummary::from_slice(&shard);
    tracing::debug!(
        rank,
        count = local.count,
        min = local.min,
        max = local.max,
        avg = local.avg(),
        "local shard summary"
    );

    let global_min = group.reduce(local.min, ReduceOp::Min, ROOT)?;
    let global_max = group.reduce(local.max, ReduceOp::Max, ROOT)?;
    let global_sum = group.reduce(local.sum, ReduceOp::Sum, ROOT)?;

    if options.verify {
        verify_reassembly(group, &shard, dataset)?;
    }

    match (global_min, global_max, global_sum) {
        (Some(min), Some(max), Some(sum)) => {
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            Ok(Some(GlobalSummary {
                count,
                min,
                max,
                avg,
            }))
        }
        _ => Ok(None),
    }
}

/// Gather every shard back onto the root and compare with the original.
///
/// Side-effect only: the result never feeds the statistics.
fn verify_reassembly(
    group: &mut GroupContext,
    shard: &[f64],
    original: Option<&[f64]>,
) -> Result<(), PipelineError> {
    let gathered = group.gather(shard, ROOT)?;
    if let (Some(gathered), Some(original)) = (gathered, original) {
        if gathered.as_slice() != original {
            return Err(PipelineError::VerifyMismatch);
        }
        tracing::debug!(elements = gathered.len(), "reassembly verified");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset;
    use meshbench_group::local_mesh;

    fn on_mesh<T: Send + 'static>(size: u32, f: fn(GroupContext) -> T) -> Vec<T> {
        let ctxs = local_mesh(size).unwrap();
        let handles: Vec<_> = ctxs
            .into_iter()
            .map(|ctx| std::thread::spawn(move || f(ctx)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_partitionable() {
        assert!(partitionable(8, 4));
        assert!(partitionable(0, 3));
        assert!(partitionable(6, 1));
        assert!(!partitionable(7, 2));
        assert!(!partitionable(1, 0));
    }

    #[test]
    fn test_example_scenario() {
        // 8 elements over 4 ranks: shards of length 2 per rank.
        let got = on_mesh(4, |mut ctx| {
            let data: Vec<f64> = (1..=8).map(|v| (v * 10) as f64).collect();
            let dataset = if ctx.rank() == ROOT { Some(data) } else { None };
            run(&mut ctx, 8, dataset.as_deref(), &StatsOptions { verify: true }).unwrap()
        });

        let summary = got[0].expect("root produces the summary");
        assert_eq!(summary.count, 8);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 80.0);
        assert!((summary.avg - 45.0).abs() < 1e-9);
        for rank in 1..4 {
            assert_eq!(got[rank], None);
        }
    }

    fn seeded_case(mut ctx: GroupContext) -> Option<GlobalSummary> {
        let dataset = if ctx.rank() == ROOT {
            Some(dataset::generate(12, Some(7)))
        } else {
            None
        };
        run(&mut ctx, 12, dataset.as_deref(), &StatsOptions::default()).unwrap()
    }

    #[test]
    fn test_partition_invariance() {
        let data = dataset::generate(12, Some(7));
        let expected_min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let expected_max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let expected_avg = data.iter().sum::<f64>() / 12.0;

        for size in [1, 2, 3, 4, 6] {
            let got = on_mesh(size, seeded_case);
            let summary = got[0].expect("root produces the summary");
            assert_eq!(summary.min, expected_min, "size {size}");
            assert_eq!(summary.max, expected_max, "size {size}");
            assert!(
                (summary.avg - expected_avg).abs() < 1e-9,
                "size {size}: {} vs {}",
                summary.avg,
                expected_avg
            );
        }
    }

    #[test]
    fn test_bounds_order_on_root() {
        let got = on_mesh(3, |mut ctx| {
            let dataset = if ctx.rank() == ROOT {
                Some(dataset::generate(30, Some(21)))
            } else {
                None
            };
            run(&mut ctx, 30, dataset.as_deref(), &StatsOptions::default()).unwrap()
        });
        let summary = got[0].expect("root produces the summary");
        assert!(summary.min <= summary.avg);
        assert!(summary.avg <= summary.max);
    }

    #[test]
    fn test_empty_dataset_average_is_zero() {
        let got = on_mesh(2, |mut ctx| {
            let dataset = if ctx.rank() == ROOT { Some(Vec::new()) } else { None };
            run(&mut ctx, 0, dataset.as_deref(), &StatsOptions::default()).unwrap()
        });
        let summary = got[0].expect("root produces the summary");
        assert_eq!(summary.count, 0);
        assert_eq!(summary.avg, 0.0);
    }

    #[test]
    fn test_not_partitionable_fails_on_every_rank() {
        let got = on_mesh(2, |mut ctx| {
            let dataset = if ctx.rank() == ROOT {
                Some(vec![1.0; 7])
            } else {
                None
            };
            run(&mut ctx, 7, dataset.as_deref(), &StatsOptions::default())
                .err()
                .map(|e| e.to_string())
        });
        // Both ranks reject the run before any message is exchanged.
        for rank in 0..2 {
            let message = got[rank].as_deref().expect("every rank fails");
            assert!(message.contains("cannot be split evenly"));
        }
    }

    #[test]
    fn test_dataset_length_mismatch() {
        let mut ctx = local_mesh(1).unwrap().into_iter().next().unwrap();
        let err = run(&mut ctx, 4, Some(&[1.0, 2.0, 3.0]), &StatsOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DatasetLength { len: 3, count: 4 }));
    }
}
