//! Group Context and Collectives
//!
//! [`GroupContext`] is the handle a rank holds on its group: identity
//! (rank, size), tagged blocking point-to-point messaging, and the
//! collective operations (broadcast, scatter, gather, reduce, barrier).
//! The context is passed explicitly through every operation; there is no
//! ambient group state.
//!
//! All operations are synchronous. Collectives are root-sequenced: the
//! root walks the peer ranks in ascending order and peers talk only to
//! the root, so the wait graph stays acyclic even when a payload exceeds
//! the pipe buffer. Every member must invoke a collective together or
//! skip it together; a partial invocation blocks the participants that
//! did call it.

use meshbench_ipc::{
    Envelope, Payload, TAG_BARRIER, TAG_BCAST, TAG_GATHER, TAG_REDUCE, TAG_SCATTER,
    is_collective_tag,
};

use crate::error::GroupError;
use crate::link::{Link, LinkRead, LinkWrite};

/// Reduction operator for [`GroupContext::reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Keep the smaller operand.
    Min,
    /// Keep the larger operand.
    Max,
    /// Add the operands.
    Sum,
}

impl ReduceOp {
    /// Combine two operands.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
            ReduceOp::Sum => a + b,
        }
    }

    /// The operator's identity element (`apply(identity, x) == x`).
    pub fn identity(self) -> f64 {
        match self {
            ReduceOp::Min => f64::INFINITY,
            ReduceOp::Max => f64::NEG_INFINITY,
            ReduceOp::Sum => 0.0,
        }
    }
}

/// One rank's handle on its process group.
pub struct GroupContext {
    rank: u32,
    size: u32,
    /// Indexed by peer rank; the slot at our own rank is None.
    links: Vec<Option<Link>>,
}

impl GroupContext {
    /// Build a context from raw per-peer endpoints.
    ///
    /// `endpoints[p]` must hold the (read, write) stream pair connected to
    /// rank `p` for every peer, and `None` exactly at `rank` itself.
    pub fn new(
        rank: u32,
        size: u32,
        endpoints: Vec<Option<(LinkRead, LinkWrite)>>,
    ) -> Result<Self, GroupError> {
        if size == 0 {
            return Err(GroupError::Topology("group size must be at least 1".into()));
        }
        if rank >= size {
            return Err(GroupError::RankOutOfRange { rank, size });
        }
        if endpoints.len() != size as usize {
            return Err(GroupError::Topology(format!(
                "expected {} endpoint slots, got {}",
                size,
                endpoints.len()
            )));
        }

        let mut links = Vec::with_capacity(endpoints.len());
        for (peer, slot) in endpoints.into_iter().enumerate() {
            match (peer as u32 == rank, slot) {
                (true, None) => links.push(None),
                (true, Some(_)) => {
                    return Err(GroupError::Topology(format!(
                        "rank {rank} must not have a link to itself"
                    )));
                }
                (false, Some((read, write))) => links.push(Some(Link::new(read, write))),
                (false, None) => {
                    return Err(GroupError::Topology(format!(
                        "rank {rank} is missing the link to rank {peer}"
                    )));
                }
            }
        }

        Ok(Self { rank, size, links })
    }

    /// This member's rank, 0 ≤ rank < size.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Number of members in the group, fixed at launch.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Blocking send of one payload to `dest` on a point-to-point tag.
    pub fn send(&mut self, dest: u32, tag: u32, payload: Payload) -> Result<(), GroupError> {
        if is_collective_tag(tag) {
            return Err(GroupError::ReservedTag { tag });
        }
        self.send_raw(dest, tag, payload)
    }

    /// Blocking receive of the next payload from `source` on `tag`.
    ///
    /// Envelopes from `source` carrying other tags are queued, not
    /// dropped, so request and reply channels cannot steal from each
    /// other.
    pub fn recv(&mut self, source: u32, tag: u32) -> Result<Payload, GroupError> {
        if is_collective_tag(tag) {
            return Err(GroupError::ReservedTag { tag });
        }
        self.recv_raw(source, tag)
    }

    /// Send an opaque byte buffer (copies into the envelope).
    pub fn send_bytes(&mut self, dest: u32, tag: u32, bytes: &[u8]) -> Result<(), GroupError> {
        self.send(dest, tag, Payload::Bytes(bytes.to_vec()))
    }

    /// Receive an opaque byte buffer from `source` on `tag`.
    pub fn recv_bytes(&mut self, source: u32, tag: u32) -> Result<Vec<u8>, GroupError> {
        expect_bytes(self.recv(source, tag)?)
    }

    /// Broadcast an element count from `root` to every member.
    ///
    /// Returns the broadcast value on every rank; non-root callers adopt
    /// the root's value regardless of their own.
    pub fn broadcast_count(&mut self, value: u64, root: u32) -> Result<u64, GroupError> {
        self.check_rank(root)?;
        if self.rank == root {
            for peer in self.peers() {
                self.send_raw(peer, TAG_BCAST, Payload::Count(value))?;
            }
            Ok(value)
        } else {
            expect_count(self.recv_raw(root, TAG_BCAST)?)
        }
    }

    /// Split a dataset into contiguous equal shards, one per rank.
    ///
    /// The root passes `Some(dataset)` with a length divisible by the
    /// group size and receives shard `root` back; every other rank passes
    /// `None` and receives its shard. Shard `i` goes to rank `i`.
    pub fn scatter(&mut self, data: Option<&[f64]>, root: u32) -> Result<Vec<f64>, GroupError> {
        self.check_rank(root)?;
        if self.rank != root {
            return expect_floats(self.recv_raw(root, TAG_SCATTER)?);
        }

        let data = data.ok_or(GroupError::ScatterMissingData)?;
        let size = self.size as usize;
        if data.len() % size != 0 {
            return Err(GroupError::UnevenScatter {
                len: data.len(),
                size: self.size,
            });
        }

        let chunk = data.len() / size;
        for peer in self.peers() {
            let start = peer as usize * chunk;
            let shard = data[start..start + chunk].to_vec();
            self.send_raw(peer, TAG_SCATTER, Payload::Floats(shard))?;
        }
        let start = self.rank as usize * chunk;
        Ok(data[start..start + chunk].to_vec())
    }

    /// Collect every rank's shard onto `root`, inverse of [`scatter`].
    ///
    /// Returns `Some(full)` at the root with shards concatenated in rank
    /// order, `None` everywhere else.
    ///
    /// [`scatter`]: GroupContext::scatter
    pub fn gather(&mut self, shard: &[f64], root: u32) -> Result<Option<Vec<f64>>, GroupError> {
        self.check_rank(root)?;
        if self.rank != root {
            self.send_raw(root, TAG_GATHER, Payload::Floats(shard.to_vec()))?;
            return Ok(None);
        }

        let mut full = Vec::with_capacity(shard.len() * self.size as usize);
        for rank in 0..self.size {
            if rank == self.rank {
                full.extend_from_slice(shard);
            } else {
                let part = expect_floats(self.recv_raw(rank, TAG_GATHER)?)?;
                full.extend_from_slice(&part);
            }
        }
        Ok(Some(full))
    }

    /// Combine one scalar per rank onto `root` with `op`.
    ///
    /// Returns `Some(result)` at the root, `None` everywhere else. The
    /// root folds its own value first, then the peers in ascending rank
    /// order, so the result is deterministic for a given group size.
    pub fn reduce(
        &mut self,
        value: f64,
        op: ReduceOp,
        root: u32,
    ) -> Result<Option<f64>, GroupError> {
        self.check_rank(root)?;
        if self.rank != root {
            self.send_raw(root, TAG_REDUCE, Payload::Float(value))?;
            return Ok(None);
        }

        let mut acc = value;
        for peer in self.peers() {
            let operand = expect_float(self.recv_raw(peer, TAG_REDUCE)?)?;
            acc = op.apply(acc, operand);
        }
        Ok(Some(acc))
    }

    /// Block until every member of the group has entered the barrier.
    pub fn barrier(&mut self) -> Result<(), GroupError> {
        if self.size == 1 {
            return Ok(());
        }
        if self.rank == 0 {
            for peer in 1..self.size {
                expect_token(self.recv_raw(peer, TAG_BARRIER)?)?;
            }
            for peer in 1..self.size {
                self.send_raw(peer, TAG_BARRIER, Payload::Token)?;
            }
            Ok(())
        } else {
            self.send_raw(0, TAG_BARRIER, Payload::Token)?;
            expect_token(self.recv_raw(0, TAG_BARRIER)?)
        }
    }

    fn send_raw(&mut self, dest: u32, tag: u32, payload: Payload) -> Result<(), GroupError> {
        self.check_peer(dest)?;
        let envelope = Envelope::new(self.rank, dest, tag, payload);
        let link = self.link_mut(dest)?;
        link.send(&envelope).map_err(|e| GroupError::Link {
            peer: dest,
            source: e,
        })
    }

    fn recv_raw(&mut self, source: u32, tag: u32) -> Result<Payload, GroupError> {
        self.check_peer(source)?;
        let own_rank = self.rank;
        let link = self.link_mut(source)?;

        if let Some(env) = link.take_pending(tag) {
            return Ok(env.payload);
        }

        loop {
            let env = link.read_next().map_err(|e| GroupError::Link {
                peer: source,
                source: e,
            })?;
            if env.src != source || env.dest != own_rank {
                return Err(GroupError::Misrouted {
                    peer: source,
                    src: env.src,
                    dest: env.dest,
                });
            }
            if env.tag == tag {
                return Ok(env.payload);
            }
            link.queue(env);
        }
    }

    /// Peer ranks in ascending order.
    fn peers(&self) -> Vec<u32> {
        (0..self.size).filter(|&p| p != self.rank).collect()
    }

    fn check_rank(&self, rank: u32) -> Result<(), GroupError> {
        if rank >= self.size {
            return Err(GroupError::RankOutOfRange {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }

    fn check_peer(&self, peer: u32) -> Result<(), GroupError> {
        self.check_rank(peer)?;
        if peer == self.rank {
            return Err(GroupError::SelfMessage { rank: self.rank });
        }
        Ok(())
    }

    fn link_mut(&mut self, peer: u32) -> Result<&mut Link, GroupError> {
        match self.links.get_mut(peer as usize) {
            Some(Some(link)) => Ok(link),
            _ => Err(GroupError::Topology(format!("no link to rank {peer}"))),
        }
    }
}

fn expect_count(payload: Payload) -> Result<u64, GroupError> {
    match payload {
        Payload::Count(value) => Ok(value),
        other => Err(GroupError::Protocol {
            expected: "count",
            got: other.kind(),
        }),
    }
}

fn expect_float(payload: Payload) -> Result<f64, GroupError> {
    match payload {
        Payload::Float(value) => Ok(value),
        other => Err(GroupError::Protocol {
            expected: "float",
            got: other.kind(),
        }),
    }
}

fn expect_floats(payload: Payload) -> Result<Vec<f64>, GroupError> {
    match payload {
        Payload::Floats(values) => Ok(values),
        other => Err(GroupError::Protocol {
            expected: "floats",
            got: other.kind(),
        }),
    }
}

fn expect_bytes(payload: Payload) -> Result<Vec<u8>, GroupError> {
    match payload {
        Payload::Bytes(bytes) => Ok(bytes),
        other => Err(GroupError::Protocol {
            expected: "bytes",
            got: other.kind(),
        }),
    }
}

fn expect_token(payload: Payload) -> Result<(), GroupError> {
    match payload {
        Payload::Token => Ok(()),
        other => Err(GroupError::Protocol {
            expected: "token",
            got: other.kind(),
        }),
    }
}
