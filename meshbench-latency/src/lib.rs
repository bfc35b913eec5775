#![warn(missing_docs)]
//! MeshBench Point-to-Point Latency
//!
//! Measures round-trip latency between exactly two group members with
//! a strictly sequential ping-pong loop:
//! - Rank 0 initiates and owns the clock, rank 1 echoes
//! - Direction is carried by message tags, never by arrival order
//! - Average round trip and an estimated one-way latency in
//!   microseconds, derived from one wall-clock measurement

mod pingpong;

pub use pingpong::{
    INITIATOR, LatencyError, LatencyReport, MAX_MESSAGE_BYTES, PingPongOptions, RESPONDER,
    TAG_PING, TAG_PONG, run,
};
