//! Two-Party Ping-Pong Benchmark
//!
//! Rank 0 drives the loop: it sends a fixed-size buffer to rank 1 and
//! blocks on the echo, once per iteration, with the clock running
//! around the whole sequence. Rank 1 never initiates; it receives and
//! sends the same bytes straight back. Tags disambiguate direction, so
//! a reply can never be confused with the next request.
//!
//! Iterations are strictly sequential. The loop measures round-trip
//! latency, not throughput, so no pipelining is attempted.

use std::time::{Duration, Instant};

use meshbench_group::{GroupContext, GroupError};
use serde::Serialize;
use thiserror::Error;

/// Tag on every initiator-to-responder message.
pub const TAG_PING: u32 = 0;

/// Tag on every responder-to-initiator reply.
pub const TAG_PONG: u32 = 1;

/// Rank that drives the loop and owns the timing.
pub const INITIATOR: u32 = 0;

/// Rank that echoes each message back.
pub const RESPONDER: u32 = 1;

/// Largest message buffer the benchmark will allocate.
pub const MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

/// Errors from a ping-pong run.
#[derive(Debug, Error)]
pub enum LatencyError {
    /// The benchmark is defined for exactly two ranks.
    #[error("ping-pong requires exactly 2 ranks, group has {got}")]
    GroupSize {
        /// Actual group size.
        got: u32,
    },

    /// An average over zero iterations is undefined.
    #[error("iteration count must be positive")]
    ZeroIterations,

    /// Every message must carry at least one byte.
    #[error("message size must be positive")]
    ZeroMessageSize,

    /// Requested buffer exceeds the allocation cap.
    #[error("message size {size} exceeds the {max} byte cap")]
    MessageTooLarge {
        /// Requested size in bytes.
        size: usize,
        /// Allowed maximum in bytes.
        max: usize,
    },

    /// Group communication failure.
    #[error("group operation failed: {0}")]
    Group(#[from] GroupError),
}

/// Options for one benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct PingPongOptions {
    /// Timed round trips.
    pub iterations: u64,
    /// Payload size per message in bytes.
    pub message_size: usize,
    /// Untimed round trips before the clock starts.
    pub warmup: u64,
}

impl Default for PingPongOptions {
    fn default() -> Self {
        Self {
            iterations: 1000,
            message_size: 1,
            warmup: 0,
        }
    }
}

/// Timing results, produced on the initiator only.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencyReport {
    /// Timed round trips.
    pub iterations: u64,
    /// Payload size per message in bytes.
    pub message_size: usize,
    /// Wall-clock time for the timed loop in seconds.
    pub total_secs: f64,
    /// Average round-trip latency in microseconds.
    pub avg_rtt_us: f64,
    /// Estimated one-way latency in microseconds: half the round trip,
    /// assuming symmetric transit, not measured directly.
    pub one_way_us: f64,
}

impl LatencyReport {
    fn new(iterations: u64, message_size: usize, total: Duration) -> Self {
        let total_secs = total.as_secs_f64();
        let avg_rtt_us = total_secs / iterations as f64 * 1e6;
        Self {
            iterations,
            message_size,
            total_secs,
            avg_rtt_us,
            one_way_us: avg_rtt_us / 2.0,
        }
    }
}

/// Run the ping-pong benchmark over a two-rank group.
///
/// Returns `Some(report)` on the initiator and `None` on the responder.
/// Preconditions are checked on every rank before any message moves, so
/// a violation fails the whole group without leaving a peer blocked in
/// a receive.
pub fn run(
    group: &mut GroupContext,
    options: &PingPongOptions,
) -> Result<Option<LatencyReport>, LatencyError> {
    if group.size() != 2 {
        return Err(LatencyError::GroupSize { got: group.size() });
    }
    if options.iterations == 0 {
        return Err(LatencyError::ZeroIterations);
    }
    if options.message_size == 0 {
        return Err(LatencyError::ZeroMessageSize);
    }
    if options.message_size > MAX_MESSAGE_BYTES {
        return Err(LatencyError::MessageTooLarge {
            size: options.message_size,
            max: MAX_MESSAGE_BYTES,
        });
    }

    // Both ranks start the loop together so launch skew never counts
    // against the first iteration.
    group.barrier()?;

    if group.rank() == INITIATOR {
        let buffer = vec![0u8; options.message_size];
        for _ in 0..options.warmup {
            group.send_bytes(RESPONDER, TAG_PING, &buffer)?;
            group.recv_bytes(RESPONDER, TAG_PONG)?;
        }

        let start = Instant::now();
        for _ in 0..options.iterations {
            group.send_bytes(RESPONDER, TAG_PING, &buffer)?;
            group.recv_bytes(RESPONDER, TAG_PONG)?;
        }
        let total = start.elapsed();

        let report = LatencyReport::new(options.iterations, options.message_size, total);
        tracing::debug!(
            iterations = report.iterations,
            total_secs = report.total_secs,
            avg_rtt_us = report.avg_rtt_us,
            "timed loop complete"
        );
        Ok(Some(report))
    } else {
        for _ in 0..options.warmup + options.iterations {
            let ping = group.recv_bytes(INITIATOR, TAG_PING)?;
            group.send_bytes(INITIATOR, TAG_PONG, &ping)?;
        }
        Ok(None)
    }
}
