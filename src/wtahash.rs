//! Winner-take-all hash over numeric vectors.
//!
//! Each output bit compares two fixed positions of the input vector. Only the ordering of values
//! matters, so vectors that rank their dimensions alike get similar digests regardless of scale.

use crate::bits::BitWriter;
use crate::error::{Error, Result};
use crate::minhash::splitmix64;

/// Input vector length: the width of an MPEG-7 video frame signature.
pub const WTA_DIM: usize = 380;

/// Largest digest, in bits.
pub const WTA_MAX_BITS: u32 = 256;

const SEED: u64 = 0x4953_4343_5754_4101;

const fn pairs() -> [(u16, u16); WTA_MAX_BITS as usize] {
    let mut out = [(0u16, 0u16); WTA_MAX_BITS as usize];
    let mut state = SEED;
    let mut i = 0;
    while i < out.len() {
        let (s, x) = splitmix64(state);
        state = s;
        let first = (x % WTA_DIM as u64) as u16;
        let second = ((x >> 32) % WTA_DIM as u64) as u16;
        if first != second {
            out[i] = (first, second);
            i += 1;
        }
    }
    out
}

/// Index pairs compared for each output bit.
pub const WTA_PERMUTATIONS: [(u16, u16); WTA_MAX_BITS as usize] = pairs();

/// Hash a vector into a digest of `bits` bits. A bit is set if the value at the first index of
/// its pair is strictly greater than the value at the second, so an all-equal vector hashes to
/// zero. Fails unless the vector has [`WTA_DIM`] entries and `bits` is a non-zero multiple of 8
/// up to [`WTA_MAX_BITS`].
pub fn wtahash<T: PartialOrd + Copy>(vec: &[T], bits: u32) -> Result<Vec<u8>> {
    if vec.len() != WTA_DIM {
        return Err(Error::Range(format!(
            "WTA-Hash needs a {}-dimension vector, got {}",
            WTA_DIM,
            vec.len()
        )));
    }
    if bits == 0 || bits % 8 != 0 || bits > WTA_MAX_BITS {
        return Err(Error::Range(format!(
            "WTA-Hash bit length must be a multiple of 8 up to {}, got {}",
            WTA_MAX_BITS, bits
        )));
    }
    let mut out = BitWriter::new();
    for &(first, second) in &WTA_PERMUTATIONS[..bits as usize] {
        let bit = vec[first as usize] > vec[second as usize];
        out.push(bit as u32, 1);
    }
    Ok(out.into_bytes())
}
