#![warn(missing_docs)]
//! Meshbench Wire Protocol
//!
//! Binary protocol for rank-to-rank communication over the pipe mesh.
//! Every message travels as one length-prefixed frame carrying an
//! rkyv-serialized [`Envelope`]; frames give the byte streams reliable
//! message boundaries, and tags give receivers logical channels.

mod framing;
mod messages;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_BYTES};
pub use messages::{Envelope, Payload};

/// First tag of the window reserved for collective traffic.
///
/// Tags below this value are free for point-to-point protocols; the group
/// collectives claim the window above it so application messages can never
/// be mistaken for collective ones.
pub const COLLECTIVE_TAG_BASE: u32 = 0xFFFF_FF00;

/// Broadcast fan-out tag.
pub const TAG_BCAST: u32 = COLLECTIVE_TAG_BASE;

/// Scatter shard-delivery tag.
pub const TAG_SCATTER: u32 = COLLECTIVE_TAG_BASE + 1;

/// Gather shard-return tag.
pub const TAG_GATHER: u32 = COLLECTIVE_TAG_BASE + 2;

/// Reduction operand tag.
pub const TAG_REDUCE: u32 = COLLECTIVE_TAG_BASE + 3;

/// Barrier token tag (used for both enter and release tokens).
pub const TAG_BARRIER: u32 = COLLECTIVE_TAG_BASE + 4;

/// Returns true when `tag` falls inside the reserved collective window.
pub fn is_collective_tag(tag: u32) -> bool {
    tag >= COLLECTIVE_TAG_BASE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_pong_tags_are_user_tags() {
        // The latency protocol uses tags 0 and 1; both must stay outside
        // the collective window.
        assert!(!is_collective_tag(0));
        assert!(!is_collective_tag(1));
    }

    #[test]
    fn test_collective_window_membership() {
        assert!(is_collective_tag(TAG_BCAST));
        assert!(is_collective_tag(TAG_SCATTER));
        assert!(is_collective_tag(TAG_GATHER));
        assert!(is_collective_tag(TAG_REDUCE));
        assert!(is_collective_tag(TAG_BARRIER));
        assert!(!is_collective_tag(COLLECTIVE_TAG_BASE - 1));
    }
}
