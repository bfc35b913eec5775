//! Per-Peer Links
//!
//! One link per peer rank: a framed reader, a framed writer, and a queue
//! of envelopes that arrived ahead of the tag a receiver asked for.
//! Within one (source, tag) channel arrival order is preserved; across
//! tags the queue lets receives complete in any order.

use std::collections::VecDeque;
use std::io::{Read, Write};

use meshbench_ipc::{Envelope, FrameError, FrameReader, FrameWriter};

/// Reading half of a link endpoint.
pub type LinkRead = Box<dyn Read + Send>;
/// Writing half of a link endpoint.
pub type LinkWrite = Box<dyn Write + Send>;

/// A connection to one peer rank.
pub(crate) struct Link {
    reader: FrameReader<LinkRead>,
    writer: FrameWriter<LinkWrite>,
    /// Envelopes read off the stream while waiting for a different tag.
    pending: VecDeque<Envelope>,
}

impl Link {
    pub(crate) fn new(read: LinkRead, write: LinkWrite) -> Self {
        Self {
            reader: FrameReader::new(read),
            writer: FrameWriter::new(write),
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn send(&mut self, envelope: &Envelope) -> Result<(), FrameError> {
        self.writer.send(envelope)
    }

    /// Pop the oldest queued envelope with this tag, if any.
    pub(crate) fn take_pending(&mut self, tag: u32) -> Option<Envelope> {
        let pos = self.pending.iter().position(|env| env.tag == tag)?;
        self.pending.remove(pos)
    }

    /// Read the next envelope off the stream, blocking until one arrives.
    pub(crate) fn read_next(&mut self) -> Result<Envelope, FrameError> {
        self.reader.recv()
    }

    pub(crate) fn queue(&mut self, envelope: Envelope) {
        self.pending.push_back(envelope);
    }
}
