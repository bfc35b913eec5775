//! Group Error Types

use meshbench_ipc::FrameError;
use thiserror::Error;

/// Errors from group construction, launch, messaging, and collectives.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Frame codec or stream failure on the link to one peer.
    #[error("link to rank {peer}: {source}")]
    Link {
        /// Peer rank on the failing link.
        peer: u32,
        /// Underlying frame error.
        source: FrameError,
    },

    /// I/O failure while building pipes, spawning, or waiting on ranks.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker environment variable was missing or malformed.
    #[error("invalid group environment: {0}")]
    Env(String),

    /// The endpoint table handed to the group does not describe a mesh.
    #[error("invalid topology: {0}")]
    Topology(String),

    /// A rank argument outside 0..size.
    #[error("rank {rank} out of range for group of {size}")]
    RankOutOfRange {
        /// Offending rank.
        rank: u32,
        /// Group size.
        size: u32,
    },

    /// A message addressed to the sending rank itself.
    #[error("rank {rank} cannot message itself")]
    SelfMessage {
        /// The rank that tried.
        rank: u32,
    },

    /// A point-to-point tag inside the reserved collective window.
    #[error("tag {tag:#010x} is reserved for collectives")]
    ReservedTag {
        /// Offending tag.
        tag: u32,
    },

    /// An envelope carried the wrong payload kind for the operation.
    #[error("protocol error: expected {expected} payload, got {got}")]
    Protocol {
        /// Payload kind the operation needed.
        expected: &'static str,
        /// Payload kind that arrived.
        got: &'static str,
    },

    /// An envelope arrived on a link it could not have been sent down.
    #[error("misrouted envelope on link to {peer}: src {src}, dest {dest}")]
    Misrouted {
        /// Peer rank the link belongs to.
        peer: u32,
        /// Source rank the envelope claims.
        src: u32,
        /// Destination rank the envelope claims.
        dest: u32,
    },

    /// Scatter input length is not a multiple of the group size.
    #[error("cannot scatter {len} elements evenly across {size} ranks")]
    UnevenScatter {
        /// Dataset length at the root.
        len: usize,
        /// Group size.
        size: u32,
    },

    /// Scatter was called at the root without the dataset.
    #[error("scatter at the root requires the dataset")]
    ScatterMissingData,

    /// Requested group size exceeds the launcher's descriptor budget.
    #[error("group size {size} exceeds the supported maximum {max}")]
    GroupTooLarge {
        /// Requested size.
        size: u32,
        /// Supported maximum.
        max: u32,
    },

    /// A launched rank exited abnormally.
    #[error("rank {rank} exited with status {status}")]
    RankFailed {
        /// Rank that failed.
        rank: u32,
        /// Its exit status (-1 when killed by a signal).
        status: i32,
    },
}
