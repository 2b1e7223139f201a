//! Reassembly of length-delimited frames from an arbitrarily chunked byte stream.
//!
//! The framer tracks one piece of state: the byte count of the frame at the
//! head of the buffer, once its length byte is known.
//!
//! - No length known: the first buffered byte is the length byte. Values below
//!   [`MIN_LENGTH_BYTE`] cannot start a frame and are dropped one at a time.
//! - Length known: wait until `length + 1` bytes are buffered, then split the
//!   frame off and start over on whatever follows.
//!
//! Dropping noise one byte at a time keeps the output independent of how the
//! stream was chunked.

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::frame::{Frame, MIN_LENGTH_BYTE};

#[derive(Debug, Default)]
pub struct ByteFramer {
    buffer: BytesMut,
    required: Option<usize>,
}

impl ByteFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
            required: None,
        }
    }

    /// Feed one chunk, returning every frame it completes, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let required = match self.required {
                Some(n) => n,
                None => match self.sync() {
                    Some(n) => n,
                    None => break,
                },
            };
            if self.buffer.len() < required {
                break;
            }

            let bytes = self.buffer.split_to(required).freeze();
            self.required = None;
            trace!(len = bytes.len(), "frame complete");
            frames.push(Frame::from_complete(bytes));
        }
        frames
    }

    /// Drop all buffered input and forget any partially received frame.
    pub fn clear(&mut self) {
        if !self.buffer.is_empty() {
            trace!(dropped = self.buffer.len(), "framer cleared");
        }
        self.buffer.clear();
        self.required = None;
    }

    /// Number of bytes waiting for a frame to complete.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn sync(&mut self) -> Option<usize> {
        let mut dropped = 0usize;
        while let Some(&first) = self.buffer.first() {
            if first >= MIN_LENGTH_BYTE {
                if dropped > 0 {
                    trace!(dropped, "resynchronised on length byte");
                }
                let required = first as usize + 1;
                self.required = Some(required);
                return Some(required);
            }
            self.buffer.advance(1);
            dropped += 1;
        }
        if dropped > 0 {
            trace!(dropped, "discarded noise bytes");
        }
        None
    }
}
