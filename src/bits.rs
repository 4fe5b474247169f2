//! MSB-first bit cursors over byte buffers.
//!
//! Headers are built from 4-bit groups, so neither side of the codec can work on whole bytes.
//! [`BitWriter`] appends bit fields to a growing buffer, and [`BitReader`] walks an immutable
//! byte slice one field at a time, keeping an explicit bit offset.

use crate::error::{Error, Result};

/// Append-only bit buffer. Bits are packed starting from the most significant bit of each byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitWriter {
    buf: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append the lowest `width` bits of `value`, most significant first. `width` may not exceed
    /// 32.
    pub fn push(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32);
        for shift in (0..width).rev() {
            let bit = ((value >> shift) & 1) as u8;
            let byte = self.len / 8;
            if byte == self.buf.len() {
                self.buf.push(0);
            }
            self.buf[byte] |= bit << (7 - (self.len % 8));
            self.len += 1;
        }
    }

    /// Finish writing. Any partial trailing byte is left zero-filled.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor for reading bit fields out of a byte slice.
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current bit offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// True if the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn bit_at(&self, pos: usize) -> u32 {
        ((self.data[pos / 8] >> (7 - (pos % 8))) & 1) as u32
    }

    /// Look at the next `width` bits without consuming them.
    pub fn peek(&self, width: usize, step: &'static str) -> Result<u32> {
        debug_assert!(width <= 32);
        if width > self.remaining() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.remaining(),
                expected: width,
            });
        }
        Ok((self.pos..self.pos + width).fold(0u32, |acc, p| (acc << 1) | self.bit_at(p)))
    }

    /// Read the next `width` bits as an unsigned integer.
    pub fn read(&mut self, width: usize, step: &'static str) -> Result<u32> {
        let v = self.peek(width, step)?;
        self.pos += width;
        Ok(v)
    }

    /// Count consecutive set bits from the cursor, stopping at `limit`. Never fails; returns fewer
    /// than `limit` if a clear bit or the end of the data comes first.
    pub fn leading_ones(&self, limit: usize) -> usize {
        let end = (self.pos + limit).min(self.data.len() * 8);
        (self.pos..end).take_while(|p| self.bit_at(*p) == 1).count()
    }

    /// Skip `width` bits.
    pub fn skip(&mut self, width: usize, step: &'static str) -> Result<()> {
        if width > self.remaining() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.remaining(),
                expected: width,
            });
        }
        self.pos += width;
        Ok(())
    }

    /// The bytes following the cursor. Only valid on a byte boundary.
    pub fn tail(&self) -> &'a [u8] {
        debug_assert!(self.is_aligned());
        &self.data[(self.pos + 7) / 8..]
    }
}
