//! Bounds-checked reader over a byte slice.
//!
//! Every read either advances the position or fails with
//! [`FrameError::IncompleteData`]; nothing here can index past the end.

use crate::error::{FrameError, Result};

/// Tracks a read position within a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at an absolute offset.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        ensure(buf, pos)?;
        Ok(Self { buf, pos })
    }

    /// Current absolute position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(FrameError::IncompleteData {
            needed: usize::MAX,
            available: self.buf.len(),
        })?;
        ensure(self.buf, end)?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

/// Fail with `IncompleteData` unless `buf` holds at least `needed` bytes.
pub fn ensure(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(FrameError::IncompleteData {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}
