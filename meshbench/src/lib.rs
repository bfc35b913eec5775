#![warn(missing_docs)]
//! # MeshBench
//!
//! Message-passing benchmarks over a self-launched process group.
//!
//! MeshBench wires N copies of the calling binary into a full pipe mesh
//! and runs explicit collectives on top:
//! - **Process Group**: ranks 0..N-1 connected pairwise, launched by
//!   re-executing the current binary with a hidden flag
//! - **Typed Envelopes**: length-prefixed rkyv frames carrying source,
//!   destination, and tag for routing
//! - **Distributed Statistics**: rank-order scatter, local fold, then
//!   MIN/MAX/SUM reductions onto the root
//! - **Ping-Pong Latency**: a strictly sequential two-rank loop with a
//!   microsecond round-trip average and a one-way estimate
//! - **Supervised Launch**: the launcher owns every child and tears the
//!   group down as soon as any rank fails
//!
//! ## Quick Start
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     meshbench::run_stats()
//! }
//! ```
//!
//! ## Embedding the group directly
//!
//! ```ignore
//! let mut group = meshbench::attach_worker()?;
//! let shard = group.scatter(dataset.as_deref(), 0)?;
//! let total = group.reduce(shard.iter().sum(), ReduceOp::Sum, 0)?;
//! ```

// Re-export group types
pub use meshbench_group::{
    GroupContext, GroupError, LaunchedGroup, MAX_GROUP_SIZE, ReduceOp, attach_worker, local_mesh,
    spawn_group, spawn_group_with_binary,
};

// Re-export wire types
pub use meshbench_ipc::{Envelope, FrameError, FrameReader, FrameWriter, Payload};

// Re-export benchmark results and options
pub use meshbench_latency::{LatencyError, LatencyReport, PingPongOptions};
pub use meshbench_stats::{GlobalSummary, PipelineError, ShardSummary, StatsOptions, partitionable};

/// Distributed statistics pipeline
pub mod stats {
    pub use meshbench_stats::{ROOT, dataset, run};
}

/// Two-party ping-pong benchmark
pub mod latency {
    pub use meshbench_latency::{INITIATOR, RESPONDER, TAG_PING, TAG_PONG, run};
}

/// Run the MeshBench CLI harnesses.
///
/// Call these from a tool binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     meshbench::run_latency()
/// }
/// ```
pub use meshbench_cli::{run_latency, run_stats};
