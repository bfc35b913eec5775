//! Length-Prefixed Frame Encoding
//!
//! Gives the pipe mesh reliable message boundaries. Each envelope travels
//! as a 4-byte little-endian length followed by its rkyv bytes:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | rkyv envelope    |
//! +----------------+------------------+
//! ```
//!
//! Writers flush after every envelope so a blocked peer can always make
//! progress; readers validate the archived bytes before deserializing.

use crate::messages::Envelope;
use rkyv::{Deserialize, Infallible};
use std::io::{BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Hard cap on a single frame. Guards against a corrupt length prefix
/// turning into an allocation of arbitrary size.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const STREAM_BUF_BYTES: usize = 64 * 1024;

/// Errors surfaced while moving envelopes on or off a stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying stream failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// rkyv could not serialize the envelope.
    #[error("encode error: {0}")]
    Encode(String),

    /// Frame bytes failed validation or could not be deserialized.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame length exceeded [`MAX_FRAME_BYTES`].
    #[error("oversized frame: {len} bytes (cap {max})")]
    Oversize {
        /// Length the prefix claimed.
        len: usize,
        /// The cap it exceeded.
        max: usize,
    },

    /// The peer closed its end before a complete frame arrived.
    #[error("peer disconnected")]
    Disconnected,
}

/// Writes envelopes to a byte stream, one frame per envelope.
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a stream in a buffered frame writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(STREAM_BUF_BYTES, writer),
        }
    }

    /// Frame and send one envelope, flushing to the stream.
    pub fn send(&mut self, envelope: &Envelope) -> Result<(), FrameError> {
        let bytes = rkyv::to_bytes::<_, 256>(envelope)
            .map_err(|e| FrameError::Encode(e.to_string()))?;

        let len = bytes.len();
        if len > MAX_FRAME_BYTES {
            return Err(FrameError::Oversize {
                len,
                max: MAX_FRAME_BYTES,
            });
        }

        self.writer.write_all(&(len as u32).to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        Ok(())
    }
}

/// Reads length-prefixed envelopes off a byte stream.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a stream in a buffered frame reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(STREAM_BUF_BYTES, reader),
        }
    }

    /// Receive the next envelope, blocking until a full frame arrives.
    ///
    /// A clean EOF before the length prefix maps to
    /// [`FrameError::Disconnected`]; EOF inside a frame is an I/O error.
    pub fn recv(&mut self) -> Result<Envelope, FrameError> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(FrameError::Disconnected);
            }
            Err(e) => return Err(FrameError::Io(e)),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_BYTES {
            return Err(FrameError::Oversize {
                len,
                max: MAX_FRAME_BYTES,
            });
        }
        if len == 0 {
            return Err(FrameError::Decode("zero-length frame".to_string()));
        }

        // rkyv needs the archive bytes aligned
        let mut buf = rkyv::AlignedVec::with_capacity(len);
        buf.resize(len, 0);
        self.reader.read_exact(&mut buf)?;

        let archived = rkyv::check_archived_root::<Envelope>(&buf)
            .map_err(|e| FrameError::Decode(e.to_string()))?;

        let envelope: Envelope = archived
            .deserialize(&mut Infallible)
            .expect("infallible deserialization");

        Ok(envelope)
    }
}
