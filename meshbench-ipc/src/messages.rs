//! Envelope Messages
//!
//! The unit of exchange between two ranks. An envelope names its sender,
//! its addressee, and a tag; the pair (source, tag) selects the logical
//! channel the receiver matches on. Payloads cover everything the group
//! operations need: control scalars, float runs, opaque probe bytes, and
//! empty barrier tokens.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One point-to-point message between two ranks.
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct Envelope {
    /// Rank that sent the message.
    pub src: u32,
    /// Rank the message is addressed to.
    pub dest: u32,
    /// Channel tag. (src, tag) disambiguates concurrent protocols; order
    /// is only guaranteed within one (src, dest, tag) channel.
    pub tag: u32,
    /// Message body.
    pub payload: Payload,
}

impl Envelope {
    /// Build an envelope for the given channel.
    pub fn new(src: u32, dest: u32, tag: u32, payload: Payload) -> Self {
        Self {
            src,
            dest,
            tag,
            payload,
        }
    }
}

/// Message body carried by an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum Payload {
    /// A control scalar, e.g. the element count a broadcast distributes.
    Count(u64),
    /// A single float, e.g. one rank's reduction operand.
    Float(f64),
    /// A run of 64-bit floats: a scattered shard or a gathered shard.
    Floats(Vec<f64>),
    /// Opaque bytes whose content carries no meaning (latency probes).
    Bytes(Vec<u8>),
    /// Empty barrier token.
    Token,
}

impl Payload {
    /// Short name of the payload variant, for protocol-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Count(_) => "count",
            Payload::Float(_) => "float",
            Payload::Floats(_) => "floats",
            Payload::Bytes(_) => "bytes",
            Payload::Token => "token",
        }
    }
}
