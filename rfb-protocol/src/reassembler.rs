//! Byte-stream reassembly for the incremental protocol state machine.
//!
//! The RFB client consumes the socket as an arbitrary sequence of chunks.
//! Each protocol state declares how many bytes it needs next; the
//! [`Reassembler`] accumulates inbound chunks and hands back exact-size
//! blocks once enough data has arrived.
//!
//! The driving loop looks like:
//!
//! ```
//! use rfb_protocol::Reassembler;
//!
//! let mut reassembler = Reassembler::new();
//! reassembler.expect(1);
//! reassembler.push(&[0x02, 0xAA, 0xBB]);
//! while let Some(block) = reassembler.take_block() {
//!     // dispatch `block` to the current state's handler; the handler
//!     // returns the next state and byte demand
//!     reassembler.expect(2);
//! }
//! ```
//!
//! A handler never calls back into delivery; it *returns* the next demand,
//! and the surrounding `take_block` loop keeps going. That makes re-entrant
//! delivery impossible by construction, no matter how many handler
//! transitions a single chunk satisfies. Partial bytes stay buffered until
//! more data arrives.

use bytes::{Bytes, BytesMut};

/// Accumulates inbound byte chunks and yields exact-size blocks.
///
/// The expected block size is registered with [`expect`](Self::expect) and
/// stays in force until changed; [`take_block`](Self::take_block) yields
/// `Some` only once the buffer holds at least that many bytes.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    expected: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create an empty reassembler with no registered demand.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            expected: 0,
        }
    }

    /// Register the size of the next block to deliver.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero; states with no payload must transition without
    /// consuming bytes instead of demanding an empty block.
    pub fn expect(&mut self, n: usize) {
        assert!(n > 0, "block demand must be non-zero");
        self.expected = n;
    }

    /// Append an inbound chunk to the accumulation buffer.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next block if the registered demand is satisfied.
    pub fn take_block(&mut self) -> Option<Bytes> {
        if self.expected > 0 && self.buffer.len() >= self.expected {
            let block = self.buffer.split_to(self.expected).freeze();
            Some(block)
        } else {
            None
        }
    }

    /// Currently registered byte demand.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of bytes buffered but not yet delivered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
