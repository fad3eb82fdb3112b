use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_fragmented, encode_message, OutgoingMessage};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes DTX messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    max_fragment_body: Option<usize>,
}

impl<T: Write> MessageWriter<T> {
    /// Create a writer that never fragments.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_fragment_body: None,
        }
    }

    /// Create a writer that splits bodies larger than `max_fragment_body`.
    pub fn with_max_fragment_body(inner: T, max_fragment_body: usize) -> Self {
        Self {
            max_fragment_body: Some(max_fragment_body),
            ..Self::new(inner)
        }
    }

    /// Encode and send one message (blocking). Returns the number of frames written.
    pub fn send(&mut self, message: &OutgoingMessage) -> Result<usize> {
        self.buf.clear();
        let frames = match self.max_fragment_body {
            Some(max) => encode_fragmented(message, max, &mut self.buf)?,
            None => {
                encode_message(message, &mut self.buf)?;
                1
            }
        };

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        Ok(frames)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Change the fragmentation threshold for subsequent messages.
    pub fn set_max_fragment_body(&mut self, max_fragment_body: Option<usize>) {
        self.max_fragment_body = max_fragment_body;
    }
}
