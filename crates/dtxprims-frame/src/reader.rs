use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{frame_len, MessageDecoder};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reassembly::Reassembler;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads DTX messages from any `Read` stream.
///
/// Handles partial reads and fragment reassembly internally. Callers get
/// whole messages from [`read_message`](Self::read_message), or individual
/// frames from [`read_frame`](Self::read_frame).
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    reassembler: Reassembler,
}

impl<T: Read> MessageReader<T> {
    /// Create a reader with default configuration and pass-through delegates.
    pub fn new(inner: T) -> Self {
        Self::with_decoder(inner, MessageDecoder::new())
    }

    /// Create a reader with an explicit decoder.
    pub fn with_decoder(inner: T, decoder: MessageDecoder) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            reassembler: Reassembler::new(decoder),
        }
    }

    /// Read the next complete message, joining fragments (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            let frame = self.read_frame()?;
            if let Some(message) = self.reassembler.push(frame)? {
                return Ok(message);
            }
        }
    }

    /// Read the next frame as-is, including fragment markers and continuations.
    pub fn read_frame(&mut self) -> Result<Message> {
        loop {
            if let Some(len) = frame_len(&self.buf, self.reassembler.decoder().config())? {
                let frame = self.buf.split_to(len).freeze();
                let (message, _) = self.reassembler.decoder().decode(frame)?;
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True when EOF would fall on a message boundary: nothing buffered and
    /// no fragment sequence left open.
    pub fn is_at_boundary(&self) -> bool {
        self.buf.is_empty() && self.reassembler.pending() == 0
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
