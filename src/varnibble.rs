//! Variable-length nibble integers.
//!
//! Each header field is written as 1 to 4 nibbles, with a unary prefix giving the group width:
//!
//! | Prefix | Nibbles | Payload bits | Range       |
//! | --     | --      | --           | --          |
//! | `0`    | 1       | 3            | 0 - 7       |
//! | `10`   | 2       | 6            | 8 - 71      |
//! | `110`  | 3       | 9            | 72 - 583    |
//! | `1110` | 4       | 12           | 584 - 4679  |
//!
//! The payload stores the value minus the start of its range.

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};

/// Largest value a varnibble can hold.
pub const MAX_VARNIBBLE: u32 = 4679;

// (prefix, prefix bits, payload bits, range start)
const GROUPS: [(u32, u32, u32, u32); 4] = [
    (0b0, 1, 3, 0),
    (0b10, 2, 6, 8),
    (0b110, 3, 9, 72),
    (0b1110, 4, 12, 584),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VarNibble {
    value: u32,
    group: usize,
}

impl VarNibble {
    /// Pick the shortest group for `n`. Fails if `n` is larger than [`MAX_VARNIBBLE`].
    pub fn from_u32(n: u32) -> Result<VarNibble> {
        let group = match n {
            0..=7 => 0,
            8..=71 => 1,
            72..=583 => 2,
            584..=MAX_VARNIBBLE => 3,
            _ => {
                return Err(Error::Range(format!(
                    "varnibble value {} exceeds {}",
                    n, MAX_VARNIBBLE
                )))
            }
        };
        Ok(VarNibble { value: n, group })
    }

    pub fn to_u32(self) -> u32 {
        self.value
    }

    /// Encoded width in bits: 4, 8, 12, or 16.
    pub fn bits(&self) -> usize {
        (self.group + 1) * 4
    }

    pub fn write(&self, buf: &mut BitWriter) {
        let (prefix, prefix_bits, payload_bits, start) = GROUPS[self.group];
        buf.push(prefix, prefix_bits);
        buf.push(self.value - start, payload_bits);
    }

    pub fn read(buf: &mut BitReader) -> Result<VarNibble> {
        if buf.remaining() < 4 {
            return Err(Error::LengthTooShort {
                step: "decode varnibble prefix",
                actual: buf.remaining(),
                expected: 4,
            });
        }
        let group = buf.leading_ones(4);
        if group > 3 {
            return Err(Error::Malformed(
                "varnibble prefix has no terminating zero bit within 4 nibbles".to_string(),
            ));
        }
        let (_, prefix_bits, payload_bits, start) = GROUPS[group];
        let width = (prefix_bits + payload_bits) as usize;
        if buf.remaining() < width {
            return Err(Error::LengthTooShort {
                step: "decode varnibble",
                actual: buf.remaining(),
                expected: width,
            });
        }
        buf.skip(prefix_bits as usize, "decode varnibble prefix")?;
        let payload = buf.read(payload_bits as usize, "decode varnibble payload")?;
        Ok(VarNibble {
            value: payload + start,
            group,
        })
    }
}

/// Encode `n` into a fresh bit buffer.
pub fn encode_varnibble(n: u32) -> Result<BitWriter> {
    let mut buf = BitWriter::new();
    VarNibble::from_u32(n)?.write(&mut buf);
    Ok(buf)
}

/// Decode one varnibble from the front of `bits`, advancing the reader past it.
pub fn decode_varnibble(bits: &mut BitReader) -> Result<u32> {
    VarNibble::read(bits).map(VarNibble::to_u32)
}
